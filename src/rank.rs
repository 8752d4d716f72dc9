//! Quantile-based top/bottom selection.
//!
//! Selection is by statistical threshold rather than a fixed rank count:
//! every eligible item whose value crosses the interpolated quantile is
//! kept, so ties can push a side past the nominal ratio. A side that ends
//! up with fewer than `min_items` members is replaced by the best (or worst)
//! `min_items` eligible items.

use crate::config::RankPolicy;
use crate::types::{AgentStat, Direction, RankItem, RankMeta, RankResult};
use crate::util::quantile;
use std::cmp::Ordering;

pub const REASON_NO_ELIGIBLE: &str = "no_eligible_items";
pub const REASON_RATIO_ZERO: &str = "ratio_zero_or_threshold_null";

#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    /// Share of eligible items on each side, clamped to `[0, 0.5]`.
    pub ratio: f64,
    pub min_items: usize,
    pub min_sample: usize,
    pub direction: Direction,
}

impl RankOptions {
    pub fn new(ratio: f64, direction: Direction) -> Self {
        Self {
            ratio,
            min_items: 2,
            min_sample: 0,
            direction,
        }
    }

    pub fn from_policy(policy: &RankPolicy, direction: Direction) -> Self {
        Self {
            ratio: policy.ratio,
            min_items: policy.min_items,
            min_sample: policy.min_sample,
            direction,
        }
    }
}

/// Agent metrics that can be ranked, each with its natural direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    Csat,
    Fcr,
    Sla,
    Escalation,
    Aht,
}

impl RankMetric {
    pub const ALL: [Self; 5] = [Self::Csat, Self::Fcr, Self::Sla, Self::Escalation, Self::Aht];

    pub fn direction(self) -> Direction {
        match self {
            RankMetric::Csat | RankMetric::Fcr | RankMetric::Sla => Direction::HigherIsBetter,
            RankMetric::Escalation | RankMetric::Aht => Direction::LowerIsBetter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RankMetric::Csat => "CSAT",
            RankMetric::Fcr => "FCR",
            RankMetric::Sla => "SLA",
            RankMetric::Escalation => "Escalation",
            RankMetric::Aht => "AHT",
        }
    }

    pub fn value_of(self, stat: &AgentStat) -> Option<f64> {
        let s = &stat.summary;
        match self {
            RankMetric::Csat => s.avg_csat(),
            RankMetric::Fcr => s.fcr_rate(),
            RankMetric::Sla => s.sla_rate(),
            RankMetric::Escalation => s.escalation_rate(),
            RankMetric::Aht => s.avg_aht(),
        }
    }
}

/// `(agent, metric value, total calls)` triples for ranking.
pub fn rank_items(stats: &[AgentStat], metric: RankMetric) -> Vec<RankItem> {
    stats
        .iter()
        .map(|s| RankItem::new(s.agent.clone(), metric.value_of(s), s.total_calls()))
        .collect()
}

/// Best and worst agents for `metric` under `policy`.
pub fn rank_agents(stats: &[AgentStat], metric: RankMetric, policy: &RankPolicy) -> RankResult {
    let opts = RankOptions::from_policy(policy, metric.direction());
    rank_by_quantile(&rank_items(stats, metric), &opts)
}

pub fn rank_by_quantile(items: &[RankItem], opts: &RankOptions) -> RankResult {
    let ratio = if opts.ratio.is_nan() {
        0.0
    } else {
        opts.ratio.clamp(0.0, 0.5)
    };
    let mut meta = RankMeta {
        ratio,
        min_items: opts.min_items,
        min_sample: opts.min_sample,
        eligible: 0,
        threshold_top: None,
        threshold_bottom: None,
        reason: None,
    };

    // Values are finite from here on.
    let eligible: Vec<(RankItem, f64)> = items
        .iter()
        .filter(|x| x.sample >= opts.min_sample)
        .filter_map(|x| {
            let v = x.value.filter(|v| v.is_finite())?;
            Some((x.clone(), v))
        })
        .collect();
    meta.eligible = eligible.len();

    if eligible.is_empty() {
        meta.reason = Some(REASON_NO_ELIGIBLE.to_string());
        return RankResult {
            top: Vec::new(),
            bottom: Vec::new(),
            meta,
        };
    }

    let higher = opts.direction == Direction::HigherIsBetter;
    let values: Vec<f64> = eligible.iter().map(|(_, v)| *v).collect();
    let (q_top, q_bottom) = if higher {
        (1.0 - ratio, ratio)
    } else {
        (ratio, 1.0 - ratio)
    };
    let (threshold_top, threshold_bottom) = if ratio == 0.0 {
        (None, None)
    } else {
        (quantile(&values, q_top), quantile(&values, q_bottom))
    };
    meta.threshold_top = threshold_top;
    meta.threshold_bottom = threshold_bottom;

    let (Some(t_top), Some(t_bottom)) = (threshold_top, threshold_bottom) else {
        meta.reason = Some(REASON_RATIO_ZERO.to_string());
        return RankResult {
            top: Vec::new(),
            bottom: Vec::new(),
            meta,
        };
    };

    // favorable-first ordering
    let best_first = |a: &(RankItem, f64), b: &(RankItem, f64)| -> Ordering {
        if higher {
            b.1.total_cmp(&a.1)
        } else {
            a.1.total_cmp(&b.1)
        }
    };

    let mut top: Vec<(RankItem, f64)> = eligible
        .iter()
        .filter(|(_, v)| if higher { *v >= t_top } else { *v <= t_top })
        .cloned()
        .collect();
    top.sort_by(best_first);

    let mut bottom: Vec<(RankItem, f64)> = eligible
        .iter()
        .filter(|(_, v)| if higher { *v <= t_bottom } else { *v >= t_bottom })
        .cloned()
        .collect();
    bottom.sort_by(|a, b| best_first(b, a));

    let take = opts.min_items.min(eligible.len());
    if top.len() < opts.min_items {
        let mut all = eligible.clone();
        all.sort_by(best_first);
        all.truncate(take);
        top = all;
    }
    if bottom.len() < opts.min_items {
        let mut all = eligible.clone();
        all.sort_by(|a, b| best_first(b, a));
        all.truncate(take);
        bottom = all;
    }

    RankResult {
        top: top.into_iter().map(|(item, _)| item).collect(),
        bottom: bottom.into_iter().map(|(item, _)| item).collect(),
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[f64]) -> Vec<RankItem> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| RankItem::new(format!("a{i}"), Some(*v), 50))
            .collect()
    }

    fn ids(v: &[RankItem]) -> Vec<&str> {
        v.iter().map(|x| x.id.as_str()).collect()
    }

    #[test]
    fn test_no_eligible_items() {
        let input = vec![
            RankItem::new("a", None, 100),
            RankItem::new("b", Some(f64::NAN), 100),
            RankItem::new("c", Some(90.0), 5),
        ];
        let mut opts = RankOptions::new(0.1, Direction::HigherIsBetter);
        opts.min_sample = 30;
        let r = rank_by_quantile(&input, &opts);
        assert!(r.top.is_empty() && r.bottom.is_empty());
        assert_eq!(r.meta.eligible, 0);
        assert_eq!(r.meta.reason.as_deref(), Some(REASON_NO_ELIGIBLE));
    }

    #[test]
    fn test_ratio_zero_returns_empty() {
        let r = rank_by_quantile(&items(&[1.0, 2.0, 3.0]), &RankOptions::new(0.0, Direction::HigherIsBetter));
        assert!(r.top.is_empty() && r.bottom.is_empty());
        assert_eq!(r.meta.eligible, 3);
        assert_eq!(r.meta.threshold_top, None);
        assert_eq!(r.meta.reason.as_deref(), Some(REASON_RATIO_ZERO));
    }

    #[test]
    fn test_ratio_is_clamped() {
        let r = rank_by_quantile(&items(&[1.0, 2.0, 3.0]), &RankOptions::new(0.9, Direction::HigherIsBetter));
        assert_eq!(r.meta.ratio, 0.5);
        let r = rank_by_quantile(&items(&[1.0, 2.0]), &RankOptions::new(f64::NAN, Direction::HigherIsBetter));
        assert_eq!(r.meta.ratio, 0.0);
    }

    #[test]
    fn test_higher_is_better_thresholds() {
        // 0..=10, ratio 0.2 -> top >= 8, bottom <= 2
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let r = rank_by_quantile(&items(&values), &RankOptions::new(0.2, Direction::HigherIsBetter));
        assert_eq!(r.meta.threshold_top, Some(8.0));
        assert_eq!(r.meta.threshold_bottom, Some(2.0));
        assert_eq!(ids(&r.top), vec!["a10", "a9", "a8"]);
        assert_eq!(ids(&r.bottom), vec!["a0", "a1", "a2"]);
    }

    #[test]
    fn test_lower_is_better_swaps_sides() {
        let values: Vec<f64> = (0..=10).map(|v| f64::from(v) * 100.0).collect();
        let r = rank_by_quantile(&items(&values), &RankOptions::new(0.2, Direction::LowerIsBetter));
        assert_eq!(r.meta.threshold_top, Some(200.0));
        assert_eq!(r.meta.threshold_bottom, Some(800.0));
        assert_eq!(ids(&r.top), vec!["a0", "a1", "a2"]);
        assert_eq!(ids(&r.bottom), vec!["a10", "a9", "a8"]);
    }

    #[test]
    fn test_min_items_replaces_threshold_selection() {
        // pos = 4 * 0.9 = 3.6 -> threshold 46, only a4 crosses
        let r = rank_by_quantile(
            &items(&[10.0, 20.0, 30.0, 40.0, 50.0]),
            &RankOptions::new(0.1, Direction::HigherIsBetter),
        );
        assert_eq!(ids(&r.top), vec!["a4", "a3"]);
        assert_eq!(ids(&r.bottom), vec!["a0", "a1"]);
    }

    #[test]
    fn test_min_items_capped_by_eligible_count() {
        let r = rank_by_quantile(&items(&[42.0]), &RankOptions::new(0.1, Direction::HigherIsBetter));
        assert_eq!(ids(&r.top), vec!["a0"]);
        assert_eq!(ids(&r.bottom), vec!["a0"]);
    }

    #[test]
    fn test_ties_are_all_included() {
        let r = rank_by_quantile(
            &items(&[1.0, 5.0, 5.0, 5.0, 5.0, 5.0]),
            &RankOptions::new(0.1, Direction::HigherIsBetter),
        );
        assert_eq!(r.top.len(), 5);
    }

    #[test]
    fn test_selection_grows_with_ratio() {
        let values: Vec<f64> = (0..37).map(|i| f64::from((i * 7919) % 101)).collect();
        let list = items(&values);
        let mut prev = (0, 0);
        for step in 1..=10 {
            let ratio = f64::from(step) * 0.05;
            let r = rank_by_quantile(&list, &RankOptions::new(ratio, Direction::HigherIsBetter));
            assert!(r.top.len() >= prev.0, "top shrank at ratio {ratio}");
            assert!(r.bottom.len() >= prev.1, "bottom shrank at ratio {ratio}");
            prev = (r.top.len(), r.bottom.len());
        }
    }

    #[test]
    fn test_rank_metric_directions() {
        assert_eq!(RankMetric::Csat.direction(), Direction::HigherIsBetter);
        assert_eq!(RankMetric::Aht.direction(), Direction::LowerIsBetter);
        assert_eq!(RankMetric::Escalation.direction(), Direction::LowerIsBetter);
    }
}
