use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// One raw cell as it arrives from ingestion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One contact record: an open field-name → value mapping.
///
/// A `Row` has no mutating API once built; normalization produces a
/// separate [`crate::record::CallRecord`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(HashMap<String, Value>);

impl Row {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First key from `aliases` present in the row, with its value.
    pub fn pick(&self, aliases: &[&str]) -> Option<&Value> {
        aliases.iter().find_map(|k| self.0.get(*k))
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Time-range key the overview is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKey {
    Today,
    Week,
    Month,
}

impl RangeKey {
    pub fn as_str(self) -> &'static str {
        match self {
            RangeKey::Today => "today",
            RangeKey::Week => "week",
            RangeKey::Month => "month",
        }
    }

    /// Number of calendar days covered, counting the anchor day.
    pub fn days(self) -> i64 {
        match self {
            RangeKey::Today => 1,
            RangeKey::Week => 7,
            RangeKey::Month => 30,
        }
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeKey {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" | "day" => Ok(RangeKey::Today),
            "week" => Ok(RangeKey::Week),
            "month" => Ok(RangeKey::Month),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown range '{other}' (expected today, week or month)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Ok,
    MissingColumns,
}

/// Rate-style metric result shared by CSAT, FCR, SLA and Escalation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBlock {
    /// Percentage in `[0, 100]`, one decimal. `None` when nothing was eligible
    /// or the input lacks the columns.
    pub rate: Option<f64>,
    pub eligible_count: usize,
    pub resolved_or_met_count: usize,
    pub unknown_count: usize,
    pub status: MetricStatus,
    pub definition: String,
}

impl MetricBlock {
    pub fn missing_columns(definition: impl Into<String>) -> Self {
        Self {
            rate: None,
            eligible_count: 0,
            resolved_or_met_count: 0,
            unknown_count: 0,
            status: MetricStatus::MissingColumns,
            definition: definition.into(),
        }
    }
}

/// Handle-time statistics in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AhtBlock {
    pub avg: Option<f64>,
    pub median: Option<f64>,
    pub p90: Option<f64>,
    pub eligible_count: usize,
    pub unknown_count: usize,
    pub null_rate: f64,
    pub definition: String,
}

/// CSAT distribution. The four counts always sum to the row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CsatBuckets {
    #[serde(rename = "90-100")]
    pub high: usize,
    #[serde(rename = "80-89")]
    pub mid: usize,
    #[serde(rename = "0-79")]
    pub low: usize,
    pub unknown: usize,
}

impl CsatBuckets {
    pub fn total(&self) -> usize {
        self.high + self.mid + self.low + self.unknown
    }
}

/// Aggregate metrics over one row set.
///
/// Serializes flat: each metric block's fields are emitted under a metric
/// prefix (`fcrRate`, `slaStatus`, `escalationCount`, ...). See
/// [`SummaryFields`].
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub row_count: usize,
    pub total_calls: usize,
    pub csat: MetricBlock,
    pub csat_buckets: CsatBuckets,
    pub aht: AhtBlock,
    pub fcr: MetricBlock,
    pub sla: MetricBlock,
    pub escalation: MetricBlock,
    pub flags: Vec<String>,
}

impl Summary {
    pub fn avg_csat(&self) -> Option<f64> {
        self.csat.rate
    }

    pub fn avg_aht(&self) -> Option<f64> {
        self.aht.avg
    }

    pub fn fcr_rate(&self) -> Option<f64> {
        self.fcr.rate
    }

    pub fn sla_rate(&self) -> Option<f64> {
        self.sla.rate
    }

    pub fn escalation_rate(&self) -> Option<f64> {
        self.escalation.rate
    }
}

/// Wire form of [`Summary`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFields<'a> {
    pub row_count: usize,
    pub total_calls: usize,

    pub avg_csat: Option<f64>,
    pub csat_eligible_count: usize,
    pub csat_unknown_count: usize,
    pub csat_definition: &'a str,
    pub csat_buckets: CsatBuckets,

    pub avg_aht: Option<f64>,
    pub aht_median: Option<f64>,
    pub aht_p90: Option<f64>,
    pub aht_eligible_count: usize,
    pub aht_unknown_count: usize,
    pub aht_null_rate: f64,
    pub aht_definition: &'a str,

    pub fcr_rate: Option<f64>,
    pub fcr_eligible_count: usize,
    pub fcr_resolved_count: usize,
    pub fcr_unknown_count: usize,
    pub fcr_definition: &'a str,

    pub sla_rate: Option<f64>,
    pub sla_eligible_count: usize,
    pub sla_met_count: usize,
    pub sla_unknown_count: usize,
    pub sla_status: MetricStatus,
    pub sla_definition: &'a str,

    pub escalation_rate: Option<f64>,
    pub escalation_eligible_count: usize,
    pub escalation_count: usize,
    pub escalation_unknown_count: usize,
    pub escalation_status: MetricStatus,
    pub escalation_definition: &'a str,

    pub flags: &'a [String],
}

impl<'a> From<&'a Summary> for SummaryFields<'a> {
    fn from(s: &'a Summary) -> Self {
        Self {
            row_count: s.row_count,
            total_calls: s.total_calls,

            avg_csat: s.csat.rate,
            csat_eligible_count: s.csat.eligible_count,
            csat_unknown_count: s.csat.unknown_count,
            csat_definition: &s.csat.definition,
            csat_buckets: s.csat_buckets,

            avg_aht: s.aht.avg,
            aht_median: s.aht.median,
            aht_p90: s.aht.p90,
            aht_eligible_count: s.aht.eligible_count,
            aht_unknown_count: s.aht.unknown_count,
            aht_null_rate: s.aht.null_rate,
            aht_definition: &s.aht.definition,

            fcr_rate: s.fcr.rate,
            fcr_eligible_count: s.fcr.eligible_count,
            fcr_resolved_count: s.fcr.resolved_or_met_count,
            fcr_unknown_count: s.fcr.unknown_count,
            fcr_definition: &s.fcr.definition,

            sla_rate: s.sla.rate,
            sla_eligible_count: s.sla.eligible_count,
            sla_met_count: s.sla.resolved_or_met_count,
            sla_unknown_count: s.sla.unknown_count,
            sla_status: s.sla.status,
            sla_definition: &s.sla.definition,

            escalation_rate: s.escalation.rate,
            escalation_eligible_count: s.escalation.eligible_count,
            escalation_count: s.escalation.resolved_or_met_count,
            escalation_unknown_count: s.escalation.unknown_count,
            escalation_status: s.escalation.status,
            escalation_definition: &s.escalation.definition,

            flags: &s.flags,
        }
    }
}

impl Serialize for Summary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SummaryFields::from(self).serialize(serializer)
    }
}

/// A [`Summary`] over the rows of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStat {
    #[serde(rename = "agentName")]
    pub agent: String,
    #[serde(flatten)]
    pub summary: Summary,
}

impl AgentStat {
    pub fn row_count(&self) -> usize {
        self.summary.row_count
    }

    pub fn total_calls(&self) -> usize {
        self.summary.total_calls
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyKpi {
    pub date: String,
    pub row_count: usize,
    pub avg_csat: Option<f64>,
    pub avg_aht: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankItem {
    pub id: String,
    pub value: Option<f64>,
    pub sample: usize,
}

impl RankItem {
    pub fn new(id: impl Into<String>, value: Option<f64>, sample: usize) -> Self {
        Self {
            id: id.into(),
            value,
            sample,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankMeta {
    pub ratio: f64,
    pub min_items: usize,
    pub min_sample: usize,
    pub eligible: usize,
    pub threshold_top: Option<f64>,
    pub threshold_bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankResult {
    pub top: Vec<RankItem>,
    pub bottom: Vec<RankItem>,
    pub meta: RankMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    Info,
    Warn,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightScope {
    Center,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MetricKey {
    #[serde(rename = "AHT")]
    Aht,
    #[serde(rename = "CSAT")]
    Csat,
    #[serde(rename = "FCR")]
    Fcr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub level: InsightLevel,
    pub title: String,
    pub why: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    pub scope: InsightScope,
    pub who: String,
    pub window: RangeKey,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<MetricKey, Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Center,
    Supervisor,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Within {
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "3d")]
    Days3,
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "14d")]
    Days14,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskDuration {
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "60m")]
    Min60,
    #[serde(rename = "90m")]
    Min90,
    #[serde(rename = "120m")]
    Min120,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendTask {
    pub id: String,
    pub priority: Priority,
    pub owner_type: OwnerType,
    pub owner: String,
    pub within: Within,
    pub duration: TaskDuration,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub how_many: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Output of one insight-engine invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightOutput {
    pub problems: Vec<String>,
    pub insights: Vec<Insight>,
    pub recommend_tasks: Vec<RecommendTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    #[serde(flatten)]
    pub summary: Summary,
    pub range: RangeKey,
    pub problems: Vec<String>,
    pub insights: Vec<Insight>,
    pub recommend_tasks: Vec<RecommendTask>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AgentStatRow {
    #[serde(rename = "Agent")]
    #[tabled(rename = "Agent")]
    pub agent: String,
    #[serde(rename = "Calls")]
    #[tabled(rename = "Calls")]
    pub total_calls: usize,
    #[serde(rename = "AvgAHT")]
    #[tabled(rename = "AvgAHT")]
    pub avg_aht: String,
    #[serde(rename = "AvgCSAT")]
    #[tabled(rename = "AvgCSAT")]
    pub avg_csat: String,
    #[serde(rename = "FCR")]
    #[tabled(rename = "FCR")]
    pub fcr_rate: String,
    #[serde(rename = "SLA")]
    #[tabled(rename = "SLA")]
    pub sla_rate: String,
    #[serde(rename = "Escalation")]
    #[tabled(rename = "Escalation")]
    pub escalation_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyKpiRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "Rows")]
    #[tabled(rename = "Rows")]
    pub row_count: usize,
    #[serde(rename = "AvgCSAT")]
    #[tabled(rename = "AvgCSAT")]
    pub avg_csat: String,
    #[serde(rename = "AvgAHT")]
    #[tabled(rename = "AvgAHT")]
    pub avg_aht: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankRow {
    #[serde(rename = "Side")]
    #[tabled(rename = "Side")]
    pub side: String,
    #[serde(rename = "Agent")]
    #[tabled(rename = "Agent")]
    pub agent: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Calls")]
    #[tabled(rename = "Calls")]
    pub sample: usize,
}
