use crate::config::MetricPolicy;
use crate::insights::{InsightInput, InsightSource};
use crate::record::{resolve_rows, CallRecord};
use crate::reports::{build_agent_stats_with, build_summary_with};
use crate::types::{AgentStat, InsightOutput, Overview, RangeKey, Row};

/// Summary and insights for one request. Agent stats are built first, then
/// the summary, then the insight source runs over both.
///
/// An insight source that fails leaves the rest of the overview intact with
/// empty `problems`, `insights` and `recommend_tasks`.
pub fn compose_overview(
    records: &[CallRecord],
    range: RangeKey,
    insights: &dyn InsightSource,
    policy: &MetricPolicy,
) -> Overview {
    compose_overview_with_agents(records, range, insights, policy).0
}

/// [`compose_overview`] that also hands back the per-agent stats it built.
pub fn compose_overview_with_agents(
    records: &[CallRecord],
    range: RangeKey,
    insights: &dyn InsightSource,
    policy: &MetricPolicy,
) -> (Overview, Vec<AgentStat>) {
    let agent_stats = build_agent_stats_with(records, policy);
    let summary = build_summary_with(records, policy);

    let input = InsightInput {
        window: range,
        summary: &summary,
        agent_stats: &agent_stats,
    };
    let out = insights.build(&input).unwrap_or_else(|e| {
        log::warn!("insight engine failed, returning overview without insights: {e}");
        InsightOutput::default()
    });

    let overview = Overview {
        summary,
        range,
        problems: out.problems,
        insights: out.insights,
        recommend_tasks: out.recommend_tasks,
    };
    (overview, agent_stats)
}

/// [`compose_overview`] straight from raw rows.
pub fn compose_overview_from_rows(
    rows: &[Row],
    range: RangeKey,
    insights: &dyn InsightSource,
    policy: &MetricPolicy,
) -> Overview {
    compose_overview(&resolve_rows(rows), range, insights, policy)
}
