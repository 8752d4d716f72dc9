//! Alias resolution: turns an open [`Row`] into a canonical [`CallRecord`].
//!
//! Every logical field has a fixed, ordered alias list. The first alias
//! present in the row wins, even when its value is null, except for the
//! agent identifier which takes the first non-null value.

use crate::types::{Row, Value};
use crate::util::{normalize, parse_bool_like, FieldKind};

pub const DATE_KEYS: &[&str] = &["Date", "date", "CallDate", "call_date"];

pub const AGENT_KEYS: &[&str] = &["Agent", "AgentName", "agentName", "agent_name", "agent"];

pub const CSAT_KEYS: &[&str] = &["CSAT", "csat", "Csat", "csat_score", "csatScore"];

pub const AHT_KEYS: &[&str] = &[
    "AHT",
    "aht",
    "Aht",
    "aht_sec",
    "ahtSec",
    "AHT_sec",
    "AHTSeconds",
    "aht_seconds",
    "AvgHandleTimeSeconds",
    "avg_handle_time_seconds",
    "handle_time_sec",
    "HandleTimeSec",
    "Handle_Time_Sec",
    "Handle Time (sec)",
    "Handle Time",
];

pub const RESOLUTION_KEYS: &[&str] = &[
    "Resolution_Status",
    "resolution_status",
    "resolutionStatus",
    "status",
    "Status",
];

pub const WITHIN_SLA_KEYS: &[&str] = &["WithinSLA", "within_sla", "withinSla"];

pub const SLA_PCT_KEYS: &[&str] = &["SLA", "sla", "ServiceLevel", "service_level", "serviceLevel"];

/// Agent bucket for rows without any usable agent identifier.
pub const UNKNOWN_AGENT: &str = "Unknown";

/// A column value that also remembers whether the column existed at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field<T> {
    #[default]
    Missing,
    Present(Option<T>),
}

impl<T> Field<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Present(Some(v)) => Some(v),
            _ => None,
        }
    }
}

/// One contact after alias resolution and normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallRecord {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub agent: String,
    pub csat: Option<f64>,
    /// Seconds; may be negative here, the AHT metric rejects those.
    pub aht: Option<f64>,
    pub resolution: Field<String>,
    pub within_sla: Field<bool>,
    pub sla_pct: Field<f64>,
}

impl CallRecord {
    pub fn from_row(row: &Row) -> Self {
        let date = row
            .pick(DATE_KEYS)
            .and_then(|v| normalize(v, FieldKind::Date).into_string());
        let csat = row
            .pick(CSAT_KEYS)
            .and_then(|v| normalize(v, FieldKind::Number).as_number());
        let aht = row
            .pick(AHT_KEYS)
            .and_then(|v| normalize(v, FieldKind::Duration).as_number());

        Self {
            date,
            agent: resolve_agent(row),
            csat,
            aht,
            resolution: pick_field(row, RESOLUTION_KEYS, |v| {
                normalize(v, FieldKind::Text).into_string()
            }),
            within_sla: pick_field(row, WITHIN_SLA_KEYS, parse_bool_like),
            sla_pct: pick_field(row, SLA_PCT_KEYS, |v| {
                normalize(v, FieldKind::Number).as_number()
            }),
        }
    }
}

/// Resolve every row once.
pub fn resolve_rows(rows: &[Row]) -> Vec<CallRecord> {
    rows.iter().map(CallRecord::from_row).collect()
}

/// First non-null agent identifier, or [`UNKNOWN_AGENT`].
pub fn resolve_agent(row: &Row) -> String {
    AGENT_KEYS
        .iter()
        .filter_map(|k| row.get(k))
        .find_map(|v| normalize(v, FieldKind::Text).into_string())
        .unwrap_or_else(|| UNKNOWN_AGENT.to_string())
}

fn pick_field<T>(row: &Row, aliases: &[&str], parse: impl Fn(&Value) -> Option<T>) -> Field<T> {
    match row.pick(aliases) {
        Some(v) => Field::Present(parse(v)),
        None => Field::Missing,
    }
}
