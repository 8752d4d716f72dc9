use crate::config::MetricPolicy;
use crate::metrics::{
    compute_aht, compute_csat, compute_escalation, compute_fcr, compute_sla, null_flags,
};
use crate::record::CallRecord;
use crate::types::{AgentStat, AgentStatRow, DailyKpi, DailyKpiRow, RangeKey, Summary};
use crate::util::{average, format_opt, round1};
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Run every metric computer once over `records`.
///
/// A call is one record, so `total_calls` always equals `row_count`.
pub fn build_summary(records: &[CallRecord]) -> Summary {
    build_summary_with(records, &MetricPolicy::default())
}

pub fn build_summary_with(records: &[CallRecord], policy: &MetricPolicy) -> Summary {
    let row_count = records.len();
    let (csat, csat_buckets) = compute_csat(records);
    let aht = compute_aht(records);
    let flags = null_flags(row_count, &csat, &aht, policy);
    Summary {
        row_count,
        total_calls: row_count,
        csat,
        csat_buckets,
        aht,
        fcr: compute_fcr(records),
        sla: compute_sla(records),
        escalation: compute_escalation(records),
        flags,
    }
}

pub fn build_agent_stats(records: &[CallRecord]) -> Vec<AgentStat> {
    build_agent_stats_with(records, &MetricPolicy::default())
}

/// One [`AgentStat`] per agent, fastest average handle time first.
///
/// Agents without any valid handle time go last; ties are broken by the
/// agent identifier.
pub fn build_agent_stats_with(records: &[CallRecord], policy: &MetricPolicy) -> Vec<AgentStat> {
    let mut by_agent: HashMap<&str, Vec<CallRecord>> = HashMap::new();
    for r in records {
        by_agent.entry(r.agent.as_str()).or_default().push(r.clone());
    }

    let mut stats: Vec<AgentStat> = by_agent
        .into_iter()
        .map(|(agent, rows)| AgentStat {
            agent: agent.to_string(),
            summary: build_summary_with(&rows, policy),
        })
        .collect();
    stats.sort_by(compare_by_aht);
    log::debug!(
        "built stats for {} agents from {} records",
        stats.len(),
        records.len()
    );
    stats
}

fn compare_by_aht(a: &AgentStat, b: &AgentStat) -> Ordering {
    match (a.summary.avg_aht(), b.summary.avg_aht()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.agent.cmp(&b.agent))
}

/// Per-day CSAT/AHT averages, ascending by date. Undated records are skipped.
pub fn build_daily_kpis(records: &[CallRecord]) -> Vec<DailyKpi> {
    #[derive(Default)]
    struct Acc {
        rows: usize,
        csat: Vec<f64>,
        aht: Vec<f64>,
    }

    let mut map: HashMap<&str, Acc> = HashMap::new();
    for r in records {
        let Some(date) = r.date.as_deref() else {
            continue;
        };
        let e = map.entry(date).or_default();
        e.rows += 1;
        if let Some(v) = r.csat.filter(|v| (0.0..=100.0).contains(v)) {
            e.csat.push(v);
        }
        if let Some(v) = r.aht.filter(|v| *v >= 0.0) {
            e.aht.push(v);
        }
    }

    let mut out: Vec<DailyKpi> = map
        .into_iter()
        .map(|(date, acc)| DailyKpi {
            date: date.to_string(),
            row_count: acc.rows,
            avg_csat: average(&acc.csat).map(round1),
            avg_aht: average(&acc.aht).map(round1),
        })
        .collect();
    out.sort_by(|a, b| a.date.cmp(&b.date));
    out
}

/// Records inside `range`, anchored at the latest dated record.
///
/// `today` keeps the latest day only, `week` the last 7 days and `month`
/// the last 30 days. Records without a parseable date are dropped.
pub fn filter_by_range(records: &[CallRecord], range: RangeKey) -> Vec<CallRecord> {
    let dated: Vec<(NaiveDate, &CallRecord)> = records
        .iter()
        .filter_map(|r| {
            let d = NaiveDate::parse_from_str(r.date.as_deref()?, "%Y-%m-%d").ok()?;
            Some((d, r))
        })
        .collect();
    let Some(latest) = dated.iter().map(|(d, _)| *d).max() else {
        return Vec::new();
    };
    let from = latest - Duration::days(range.days() - 1);
    let kept: Vec<CallRecord> = dated
        .into_iter()
        .filter(|(d, _)| *d >= from && *d <= latest)
        .map(|(_, r)| r.clone())
        .collect();
    log::debug!(
        "range {range}: kept {} of {} records ({from}..={latest})",
        kept.len(),
        records.len()
    );
    kept
}

/// Drill-down subset for one agent.
pub fn agent_records(records: &[CallRecord], agent: &str) -> Vec<CallRecord> {
    records.iter().filter(|r| r.agent == agent).cloned().collect()
}

pub fn agent_stat_rows(stats: &[AgentStat]) -> Vec<AgentStatRow> {
    stats
        .iter()
        .map(|s| AgentStatRow {
            agent: s.agent.clone(),
            total_calls: s.total_calls(),
            avg_aht: format_opt(s.summary.avg_aht(), 1, "s"),
            avg_csat: format_opt(s.summary.avg_csat(), 1, ""),
            fcr_rate: format_opt(s.summary.fcr_rate(), 1, "%"),
            sla_rate: format_opt(s.summary.sla_rate(), 1, "%"),
            escalation_rate: format_opt(s.summary.escalation_rate(), 1, "%"),
        })
        .collect()
}

pub fn daily_kpi_rows(days: &[DailyKpi]) -> Vec<DailyKpiRow> {
    days.iter()
        .map(|d| DailyKpiRow {
            date: d.date.clone(),
            row_count: d.row_count,
            avg_csat: format_opt(d.avg_csat, 1, ""),
            avg_aht: format_opt(d.avg_aht, 1, "s"),
        })
        .collect()
}
