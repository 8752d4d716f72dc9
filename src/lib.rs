//! Call-center KPI engine.
//!
//! Raw activity rows go through alias resolution and normalization
//! ([`record`], [`util`]), then feed the metric computers ([`metrics`]),
//! per-row-set and per-agent summaries ([`reports`]), quantile rankings
//! ([`rank`]) and the insight rules ([`insights`]). [`overview`] ties them
//! together for one time range.
//!
//! Everything here is synchronous and side-effect free; callers recompute
//! from the full row set on every request.

pub mod config;
pub mod error;
pub mod insights;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod overview;
pub mod rank;
pub mod record;
pub mod reports;
pub mod types;
pub mod util;

pub use config::{InsightPolicy, MetricPolicy, Policy, RankPolicy};
pub use error::{Error, Result};
pub use insights::{build_insights, InsightInput, InsightSource, NoInsights, RuleEngine};
pub use overview::{
    compose_overview, compose_overview_from_rows, compose_overview_with_agents,
};
pub use rank::{rank_agents, rank_by_quantile, RankMetric, RankOptions};
pub use record::{resolve_rows, CallRecord};
pub use reports::{build_agent_stats, build_daily_kpis, build_summary, filter_by_range};
pub use types::{
    AgentStat, Direction, Insight, InsightOutput, MetricBlock, MetricStatus, Overview, RangeKey,
    RankItem, RankResult, RecommendTask, Row, Summary, Value,
};
pub use util::{normalize, FieldKind, NormalizedValue};
