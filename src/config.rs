//! Tunable thresholds for metrics, rankings and insight rules.
//!
//! Every field has a default, so a policy file only needs the values it
//! overrides:
//!
//! ```json
//! { "rank": { "ratio": 0.2, "minSample": 20 }, "insights": { "ahtTooHighSec": 720 } }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Policy {
    pub metrics: MetricPolicy,
    pub rank: RankPolicy,
    pub insights: InsightPolicy,
}

impl Policy {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let policy: Policy = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.metrics.null_flag_rate) {
            return Err(Error::Config(format!(
                "metrics.nullFlagRate must be within [0, 1], got {}",
                self.metrics.null_flag_rate
            )));
        }
        if !(0.0..=0.5).contains(&self.rank.ratio) {
            return Err(Error::Config(format!(
                "rank.ratio must be within [0, 0.5], got {}",
                self.rank.ratio
            )));
        }
        if self.insights.aht_too_low_sec >= self.insights.aht_too_high_sec {
            return Err(Error::Config(
                "insights.ahtTooLowSec must be below insights.ahtTooHighSec".into(),
            ));
        }
        Ok(())
    }
}

/// When a metric gets a `*_MANY_NULLS` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricPolicy {
    pub null_flag_min_rows: usize,
    pub null_flag_rate: f64,
}

impl Default for MetricPolicy {
    fn default() -> Self {
        Self {
            null_flag_min_rows: 10,
            null_flag_rate: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RankPolicy {
    pub ratio: f64,
    pub min_items: usize,
    pub min_sample: usize,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            ratio: 0.1,
            min_items: 2,
            min_sample: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightPolicy {
    /// Agents with fewer calls are ignored by the per-agent rules.
    pub min_sample_calls: usize,
    pub csat_target: f64,
    pub csat_critical: f64,
    pub fcr_target: f64,
    pub fcr_critical: f64,
    pub aht_too_low_sec: f64,
    pub aht_too_high_sec: f64,
}

impl Default for InsightPolicy {
    fn default() -> Self {
        Self {
            min_sample_calls: 30,
            csat_target: 85.0,
            csat_critical: 80.0,
            fcr_target: 80.0,
            fcr_critical: 70.0,
            aht_too_low_sec: 300.0,
            aht_too_high_sec: 900.0,
        }
    }
}
