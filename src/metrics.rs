//! The five metric computers.
//!
//! Each computer walks the full record set once and returns its own block.
//! Rows that cannot be judged are counted as unknown and kept out of the
//! denominator; a missing input column turns the block into
//! `missing_columns` instead of an error.

use crate::config::MetricPolicy;
use crate::record::CallRecord;
use crate::types::{AhtBlock, CsatBuckets, MetricBlock, MetricStatus};
use crate::util::{average, median_sorted, percent, percentile_rank, round1};

pub const FLAG_AHT_MANY_NULLS: &str = "AHT_MANY_NULLS";
pub const FLAG_CSAT_MANY_NULLS: &str = "CSAT_MANY_NULLS";

const CSAT_DEFINITION: &str = "CSAT=mean of scores within [0,100]; out-of-range or missing scores are unknown";
const AHT_DEFINITION: &str = "AHT=mean/median/p90 of non-negative handle times in seconds";
const FCR_DEFINITION: &str =
    "FCR=Resolved / (Resolved + NotResolved); unknown statuses are excluded from the denominator";
const SLA_FLAG_DEFINITION: &str =
    "SLA=WithinSLA(true) / eligible; unparseable flags are excluded from the denominator";
const SLA_PCT_DEFINITION: &str = "SLA=mean of SLA/ServiceLevel percentages within [0,100]";
const SLA_MISSING_DEFINITION: &str = "SLA=missing input columns (no SLA, ServiceLevel or WithinSLA)";
const ESCALATION_DEFINITION: &str =
    "Escalation=count(Transfer to L2 or Escalation) / eligible; unknown statuses are excluded from the denominator";
const ESCALATION_MISSING_DEFINITION: &str =
    "Escalation=missing input columns (no Resolution_Status)";

const RESOLVED_WORDS: &[&str] = &["resolved", "solved", "complete", "completed", "done", "closed"];
const NOT_RESOLVED_WORDS: &[&str] = &[
    "open",
    "pending",
    "in progress",
    "escalated",
    "transferred",
    "unresolved",
];
const ESCALATION_MARKERS: &[&str] = &["transfer to l2", "escalation", "escalated"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    NotResolved,
    Unknown,
}

/// Classify a resolution-status text by exact keyword match.
pub fn classify_resolution(status: Option<&str>) -> Resolution {
    let Some(s) = status.map(|s| s.trim().to_lowercase()) else {
        return Resolution::Unknown;
    };
    if RESOLVED_WORDS.contains(&s.as_str()) {
        Resolution::Resolved
    } else if NOT_RESOLVED_WORDS.contains(&s.as_str()) {
        Resolution::NotResolved
    } else {
        Resolution::Unknown
    }
}

/// `Some(true)` when the status text mentions an escalation, `None` when
/// there is no status to judge.
pub fn is_escalation(status: Option<&str>) -> Option<bool> {
    let s = status?.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    Some(ESCALATION_MARKERS.iter().any(|m| s.contains(m)))
}

/// CSAT rate plus the bucket side-view.
pub fn compute_csat(records: &[CallRecord]) -> (MetricBlock, CsatBuckets) {
    let mut buckets = CsatBuckets::default();
    let mut values = Vec::with_capacity(records.len());

    for r in records {
        match r.csat {
            Some(v) if (0.0..=100.0).contains(&v) => {
                if v >= 90.0 {
                    buckets.high += 1;
                } else if v >= 80.0 {
                    buckets.mid += 1;
                } else {
                    buckets.low += 1;
                }
                values.push(v);
            }
            _ => buckets.unknown += 1,
        }
    }

    let block = MetricBlock {
        rate: average(&values).map(round1),
        eligible_count: values.len(),
        resolved_or_met_count: 0,
        unknown_count: records.len() - values.len(),
        status: MetricStatus::Ok,
        definition: CSAT_DEFINITION.to_string(),
    };
    (block, buckets)
}

pub fn compute_aht(records: &[CallRecord]) -> AhtBlock {
    let mut values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.aht)
        .filter(|v| *v >= 0.0)
        .collect();
    values.sort_by(f64::total_cmp);

    let total = records.len();
    let valid = values.len();
    AhtBlock {
        avg: average(&values).map(round1),
        median: median_sorted(&values).map(round1),
        p90: percentile_rank(&values, 0.9).map(round1),
        eligible_count: valid,
        unknown_count: total - valid,
        null_rate: if total > 0 {
            (total - valid) as f64 / total as f64
        } else {
            0.0
        },
        definition: AHT_DEFINITION.to_string(),
    }
}

pub fn compute_fcr(records: &[CallRecord]) -> MetricBlock {
    let (mut resolved, mut not_resolved, mut unknown) = (0usize, 0usize, 0usize);
    for r in records {
        match classify_resolution(r.resolution.value().map(String::as_str)) {
            Resolution::Resolved => resolved += 1,
            Resolution::NotResolved => not_resolved += 1,
            Resolution::Unknown => unknown += 1,
        }
    }
    let eligible = resolved + not_resolved;
    MetricBlock {
        rate: percent(resolved, eligible),
        eligible_count: eligible,
        resolved_or_met_count: resolved,
        unknown_count: unknown,
        status: MetricStatus::Ok,
        definition: FCR_DEFINITION.to_string(),
    }
}

/// SLA adherence. Column availability is probed on the first record: a
/// boolean flag column takes precedence over a percentage column.
pub fn compute_sla(records: &[CallRecord]) -> MetricBlock {
    let probe = records.first().cloned().unwrap_or_default();

    if probe.within_sla.is_present() {
        let (mut met, mut eligible, mut unknown) = (0usize, 0usize, 0usize);
        for r in records {
            match r.within_sla.value() {
                Some(true) => {
                    met += 1;
                    eligible += 1;
                }
                Some(false) => eligible += 1,
                None => unknown += 1,
            }
        }
        return MetricBlock {
            rate: percent(met, eligible),
            eligible_count: eligible,
            resolved_or_met_count: met,
            unknown_count: unknown,
            status: MetricStatus::Ok,
            definition: SLA_FLAG_DEFINITION.to_string(),
        };
    }

    if probe.sla_pct.is_present() {
        let values: Vec<f64> = records
            .iter()
            .filter_map(|r| r.sla_pct.value().copied())
            .filter(|v| (0.0..=100.0).contains(v))
            .collect();
        return MetricBlock {
            rate: average(&values).map(round1),
            eligible_count: values.len(),
            resolved_or_met_count: 0,
            unknown_count: records.len() - values.len(),
            status: MetricStatus::Ok,
            definition: SLA_PCT_DEFINITION.to_string(),
        };
    }

    MetricBlock::missing_columns(SLA_MISSING_DEFINITION)
}

pub fn compute_escalation(records: &[CallRecord]) -> MetricBlock {
    let probe = records.first().cloned().unwrap_or_default();
    if !probe.resolution.is_present() {
        return MetricBlock::missing_columns(ESCALATION_MISSING_DEFINITION);
    }

    let (mut escalated, mut eligible, mut unknown) = (0usize, 0usize, 0usize);
    for r in records {
        match is_escalation(r.resolution.value().map(String::as_str)) {
            Some(true) => {
                escalated += 1;
                eligible += 1;
            }
            Some(false) => eligible += 1,
            None => unknown += 1,
        }
    }
    MetricBlock {
        rate: percent(escalated, eligible),
        eligible_count: eligible,
        resolved_or_met_count: escalated,
        unknown_count: unknown,
        status: MetricStatus::Ok,
        definition: ESCALATION_DEFINITION.to_string(),
    }
}

/// Data-quality flags for metrics with too many unusable values.
pub fn null_flags(
    row_count: usize,
    csat: &MetricBlock,
    aht: &AhtBlock,
    policy: &MetricPolicy,
) -> Vec<String> {
    let mut flags = Vec::new();
    if row_count < policy.null_flag_min_rows || row_count == 0 {
        return flags;
    }
    if aht.null_rate >= policy.null_flag_rate {
        flags.push(FLAG_AHT_MANY_NULLS.to_string());
    }
    let csat_null_rate = csat.unknown_count as f64 / row_count as f64;
    if csat_null_rate >= policy.null_flag_rate {
        flags.push(FLAG_CSAT_MANY_NULLS.to_string());
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    fn rec() -> CallRecord {
        CallRecord::default()
    }

    fn with_status(s: &str) -> CallRecord {
        CallRecord {
            resolution: Field::Present(Some(s.to_string())),
            ..rec()
        }
    }

    #[test]
    fn test_csat_out_of_range_is_unknown() {
        let records: Vec<CallRecord> = [Some(95.0), Some(85.0), Some(60.0), Some(120.0), Some(-1.0), None]
            .into_iter()
            .map(|csat| CallRecord { csat, ..rec() })
            .collect();
        let (block, buckets) = compute_csat(&records);
        assert_eq!(block.eligible_count, 3);
        assert_eq!(block.unknown_count, 3);
        assert_eq!(block.rate, Some(80.0));
        assert_eq!(buckets.high, 1);
        assert_eq!(buckets.mid, 1);
        assert_eq!(buckets.low, 1);
        assert_eq!(buckets.unknown, 3);
        assert_eq!(buckets.total(), records.len());
    }

    #[test]
    fn test_aht_stats_skip_negative_values() {
        let records: Vec<CallRecord> = [Some(100.0), Some(-20.0), Some(300.0), Some(200.0), None]
            .into_iter()
            .map(|aht| CallRecord { aht, ..rec() })
            .collect();
        let block = compute_aht(&records);
        assert_eq!(block.eligible_count, 3);
        assert_eq!(block.unknown_count, 2);
        assert_eq!(block.avg, Some(200.0));
        assert_eq!(block.median, Some(200.0));
        // ceil(0.9 * 3) - 1 = 2
        assert_eq!(block.p90, Some(300.0));
        assert_eq!(block.null_rate, 0.4);
    }

    #[test]
    fn test_classify_resolution_keywords() {
        assert_eq!(classify_resolution(Some("Resolved")), Resolution::Resolved);
        assert_eq!(classify_resolution(Some(" CLOSED ")), Resolution::Resolved);
        assert_eq!(classify_resolution(Some("In Progress")), Resolution::NotResolved);
        assert_eq!(classify_resolution(Some("Escalated")), Resolution::NotResolved);
        assert_eq!(classify_resolution(Some("Partially Resolved")), Resolution::Unknown);
        assert_eq!(classify_resolution(None), Resolution::Unknown);
    }

    #[test]
    fn test_fcr_excludes_unknown_from_denominator() {
        let records = vec![
            with_status("Resolved"),
            with_status("Done"),
            with_status("Pending"),
            with_status("Partially Resolved"),
            rec(),
        ];
        let block = compute_fcr(&records);
        assert_eq!(block.eligible_count, 3);
        assert_eq!(block.resolved_or_met_count, 2);
        assert_eq!(block.unknown_count, 2);
        assert_eq!(block.rate, Some(66.7));
    }

    #[test]
    fn test_sla_flag_mode() {
        let flag = |v: Option<bool>| CallRecord {
            within_sla: Field::Present(v),
            ..rec()
        };
        let records = vec![flag(Some(true)), flag(Some(true)), flag(Some(false)), flag(None), rec()];
        let block = compute_sla(&records);
        assert_eq!(block.status, MetricStatus::Ok);
        assert_eq!(block.eligible_count, 3);
        assert_eq!(block.resolved_or_met_count, 2);
        assert_eq!(block.unknown_count, 2);
        assert_eq!(block.rate, Some(66.7));
    }

    #[test]
    fn test_sla_percentage_mode() {
        let pct = |v: Option<f64>| CallRecord {
            sla_pct: Field::Present(v),
            ..rec()
        };
        let records = vec![pct(Some(90.0)), pct(Some(80.0)), pct(None), pct(Some(150.0))];
        let block = compute_sla(&records);
        assert_eq!(block.status, MetricStatus::Ok);
        assert_eq!(block.rate, Some(85.0));
        assert_eq!(block.eligible_count, 2);
        assert_eq!(block.resolved_or_met_count, 0);
        assert_eq!(block.unknown_count, 2);
    }

    #[test]
    fn test_sla_probe_uses_first_record_only() {
        let records = vec![
            rec(),
            CallRecord {
                within_sla: Field::Present(Some(true)),
                ..rec()
            },
        ];
        let block = compute_sla(&records);
        assert_eq!(block.status, MetricStatus::MissingColumns);
        assert_eq!(block.rate, None);
    }

    #[test]
    fn test_escalation_markers() {
        let records = vec![
            with_status("Transfer to L2"),
            with_status("Escalated"),
            with_status("Needs escalation"),
            with_status("Resolved"),
            CallRecord {
                resolution: Field::Present(None),
                ..rec()
            },
        ];
        let block = compute_escalation(&records);
        assert_eq!(block.status, MetricStatus::Ok);
        assert_eq!(block.eligible_count, 4);
        assert_eq!(block.resolved_or_met_count, 3);
        assert_eq!(block.unknown_count, 1);
        assert_eq!(block.rate, Some(75.0));
    }

    #[test]
    fn test_empty_records_yield_null_rates() {
        let (csat, buckets) = compute_csat(&[]);
        assert_eq!(csat.rate, None);
        assert_eq!(buckets.total(), 0);
        assert_eq!(compute_aht(&[]).avg, None);
        assert_eq!(compute_fcr(&[]).rate, None);
        assert_eq!(compute_sla(&[]).status, MetricStatus::MissingColumns);
        assert_eq!(compute_escalation(&[]).status, MetricStatus::MissingColumns);
    }

    #[test]
    fn test_null_flags_thresholds() {
        let policy = MetricPolicy::default();
        let mut records: Vec<CallRecord> = (0..7)
            .map(|_| CallRecord {
                aht: Some(100.0),
                csat: Some(90.0),
                ..rec()
            })
            .collect();
        records.extend((0..3).map(|_| rec()));
        let (csat, _) = compute_csat(&records);
        let aht = compute_aht(&records);
        let flags = null_flags(records.len(), &csat, &aht, &policy);
        assert_eq!(flags, vec![FLAG_AHT_MANY_NULLS, FLAG_CSAT_MANY_NULLS]);

        // fewer than ten rows never flags
        let (csat, _) = compute_csat(&records[3..]);
        let aht = compute_aht(&records[3..]);
        assert!(null_flags(7, &csat, &aht, &policy).is_empty());
    }
}
