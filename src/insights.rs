//! Rule-based insight and task generator.
//!
//! Rules run in a fixed order (center CSAT, center FCR, per-agent AHT too
//! low, per-agent AHT too high), so identical input always yields identical
//! output, ids included.

use crate::config::InsightPolicy;
use crate::error::Result;
use crate::types::{
    AgentStat, Insight, InsightLevel, InsightOutput, InsightScope, MetricKey, OwnerType, Priority,
    RangeKey, RecommendTask, Summary, TaskDuration, Within,
};
use std::collections::{BTreeMap, HashSet};

pub const MAX_PROBLEMS: usize = 8;

const CENTER: &str = "center";

/// Everything one insight evaluation looks at.
#[derive(Debug, Clone, Copy)]
pub struct InsightInput<'a> {
    pub window: RangeKey,
    pub summary: &'a Summary,
    pub agent_stats: &'a [AgentStat],
}

/// Lowercase, keep alphanumerics, collapse everything else into single `_`.
///
/// Distinct names can share a slug (`Mei Tanaka`, `mei-tanaka`); the rule
/// engine suffixes the later ids so one output never repeats an id.
pub fn slug(seed: &str) -> String {
    let mut out = String::with_capacity(seed.len());
    let mut pending_sep = false;
    for c in seed.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// `<prefix>_<slug(seed)>_<window>`
pub fn derive_id(prefix: &str, seed: &str, window: RangeKey) -> String {
    format!("{prefix}_{}_{}", slug(seed), window.as_str())
}

/// Apply the fixed rule set. Never fails and never returns an empty
/// insight list.
pub fn build_insights(input: &InsightInput<'_>, policy: &InsightPolicy) -> InsightOutput {
    let mut rules = Rules {
        window: input.window,
        policy,
        out: InsightOutput::default(),
    };

    rules.center_csat(input.summary);
    rules.center_fcr(input.summary);

    let eligible: Vec<&AgentStat> = input
        .agent_stats
        .iter()
        .filter(|a| a.total_calls() >= policy.min_sample_calls)
        .collect();
    for a in &eligible {
        rules.agent_aht_too_low(a);
    }
    for a in &eligible {
        rules.agent_aht_too_high(a);
    }

    rules.finish()
}

struct Rules<'a> {
    window: RangeKey,
    policy: &'a InsightPolicy,
    out: InsightOutput,
}

impl Rules<'_> {
    fn center_csat(&mut self, summary: &Summary) {
        let Some(csat) = summary.avg_csat() else {
            return;
        };
        if csat >= self.policy.csat_target {
            return;
        }
        let w = self.window;
        self.out.problems.push("CSAT below target".to_string());
        self.out.insights.push(Insight {
            id: derive_id("ins", "center_csat_low", w),
            level: if csat < self.policy.csat_critical {
                InsightLevel::Critical
            } else {
                InsightLevel::Warn
            },
            title: "Low CSAT (center)".to_string(),
            why: format!(
                "Average CSAT is {csat}%, below the {}% target.",
                self.policy.csat_target
            ),
            impact: Some(
                "Lower satisfaction leads directly to repeat contacts and churn risk.".to_string(),
            ),
            scope: InsightScope::Center,
            who: CENTER.to_string(),
            window: w,
            metrics: BTreeMap::from([(MetricKey::Csat, Some(csat))]),
        });
        self.out.recommend_tasks.push(RecommendTask {
            id: derive_id("task", "center_csat_review", w),
            priority: Priority::P0,
            owner_type: OwnerType::Supervisor,
            owner: CENTER.to_string(),
            within: Within::Days3,
            duration: TaskDuration::Min60,
            task: "Listen to 10 low-CSAT calls and summarize the three most common causes."
                .to_string(),
            how_many: Some(10),
            evidence: Some("CSAT is below target; finding the cause is the fastest fix.".to_string()),
        });
    }

    fn center_fcr(&mut self, summary: &Summary) {
        let Some(fcr) = summary.fcr_rate() else {
            return;
        };
        if fcr >= self.policy.fcr_target {
            return;
        }
        let w = self.window;
        self.out.problems.push("FCR below target".to_string());
        self.out.insights.push(Insight {
            id: derive_id("ins", "center_fcr_low", w),
            level: if fcr < self.policy.fcr_critical {
                InsightLevel::Critical
            } else {
                InsightLevel::Warn
            },
            title: "Low FCR (center)".to_string(),
            why: format!("FCR is {fcr}%, so repeat contacts are likely to rise."),
            impact: Some("Repeat calls drive up AHT, cost and dissatisfaction.".to_string()),
            scope: InsightScope::Center,
            who: CENTER.to_string(),
            window: w,
            metrics: BTreeMap::from([(MetricKey::Fcr, Some(fcr))]),
        });
        self.out.recommend_tasks.push(RecommendTask {
            id: derive_id("task", "center_fcr_checklist", w),
            priority: Priority::P0,
            owner_type: OwnerType::Center,
            owner: CENTER.to_string(),
            within: Within::Days7,
            duration: TaskDuration::Min120,
            task: "Draft a first-contact-resolution checklist and roll it into daily operations."
                .to_string(),
            how_many: None,
            evidence: Some("Low FCR increases repeat calls.".to_string()),
        });
    }

    fn agent_aht_too_low(&mut self, a: &AgentStat) {
        let Some(aht) = a.summary.avg_aht() else {
            return;
        };
        if aht >= self.policy.aht_too_low_sec {
            return;
        }
        let w = self.window;
        let name = a.agent.as_str();
        self.out.problems.push(format!("AHT too short: {name}"));
        self.out.insights.push(Insight {
            id: derive_id("ins", &format!("aht_too_low_{name}"), w),
            level: InsightLevel::Warn,
            title: "AHT too short (quality risk)".to_string(),
            why: format!(
                "{name} averages {}s per call, under the {}s floor; checks may be skipped.",
                aht.round(),
                self.policy.aht_too_low_sec
            ),
            impact: Some(
                "Missed checks cause wrong answers, repeat calls and lower CSAT.".to_string(),
            ),
            scope: InsightScope::Agent,
            who: name.to_string(),
            window: w,
            metrics: agent_metrics(a),
        });
        self.out.recommend_tasks.push(RecommendTask {
            id: derive_id("task", &format!("listen_too_low_{name}"), w),
            priority: Priority::P0,
            owner_type: OwnerType::Supervisor,
            owner: name.to_string(),
            within: Within::Days3,
            duration: TaskDuration::Min30,
            task: "Listen to 3 recent calls and check for skipped steps (identity check, \
                   requirement confirmation, read-back, next action)."
                .to_string(),
            how_many: Some(3),
            evidence: Some("AHT is too short; quality may be slipping.".to_string()),
        });
        self.out.recommend_tasks.push(RecommendTask {
            id: derive_id("task", &format!("knowledge_speed_{name}"), w),
            priority: Priority::P1,
            owner_type: OwnerType::Agent,
            owner: name.to_string(),
            within: Within::Days7,
            duration: TaskDuration::Min60,
            task: "Review the knowledge-base search flow and bookmark the most used articles."
                .to_string(),
            how_many: None,
            evidence: Some(
                "Separates skipped steps caused by knowledge gaps from genuine proficiency."
                    .to_string(),
            ),
        });
    }

    fn agent_aht_too_high(&mut self, a: &AgentStat) {
        let Some(aht) = a.summary.avg_aht() else {
            return;
        };
        if aht <= self.policy.aht_too_high_sec {
            return;
        }
        let w = self.window;
        let name = a.agent.as_str();
        self.out.problems.push(format!("AHT too long: {name}"));
        self.out.insights.push(Insight {
            id: derive_id("ins", &format!("aht_too_high_{name}"), w),
            level: InsightLevel::Warn,
            title: "AHT too long (efficiency risk)".to_string(),
            why: format!(
                "{name} averages {}s per call, over the {}s ceiling; searching, holds or \
                 processing may be stuck.",
                aht.round(),
                self.policy.aht_too_high_sec
            ),
            impact: Some("Lower throughput and longer queues hurt CSAT.".to_string()),
            scope: InsightScope::Agent,
            who: name.to_string(),
            window: w,
            metrics: agent_metrics(a),
        });
        self.out.recommend_tasks.push(RecommendTask {
            id: derive_id("task", &format!("coach_too_high_{name}"), w),
            priority: Priority::P0,
            owner_type: OwnerType::Supervisor,
            owner: name.to_string(),
            within: Within::Days7,
            duration: TaskDuration::Min60,
            task: "Listen to 2 calls, find where time goes (search, hold, explanation, \
                   processing) and agree on one improvement."
                .to_string(),
            how_many: Some(2),
            evidence: Some("AHT exceeds the ceiling; locate the bottleneck first.".to_string()),
        });
    }

    fn finish(mut self) -> InsightOutput {
        if self.out.insights.is_empty() {
            self.out.insights.push(Insight {
                id: derive_id("ins", "no_findings", self.window),
                level: InsightLevel::Info,
                title: "No major issues detected".to_string(),
                why: "No rule conditions matched for this window.".to_string(),
                impact: None,
                scope: InsightScope::Center,
                who: CENTER.to_string(),
                window: self.window,
                metrics: BTreeMap::new(),
            });
        }
        let mut seen = HashSet::new();
        self.out.problems.retain(|p| seen.insert(p.clone()));
        self.out.problems.truncate(MAX_PROBLEMS);

        let window = self.window;
        disambiguate_ids(self.out.insights.iter_mut().map(|i| &mut i.id), window);
        disambiguate_ids(self.out.recommend_tasks.iter_mut().map(|t| &mut t.id), window);
        self.out
    }
}

/// Make ids unique in emission order. A repeated id gets `_2`, `_3`, ...
/// inserted before its window suffix, so the first holder keeps the plain id.
fn disambiguate_ids<'a>(ids: impl Iterator<Item = &'a mut String>, window: RangeKey) {
    let suffix = format!("_{}", window.as_str());
    let mut used: HashSet<String> = HashSet::new();
    for id in ids {
        if used.insert(id.clone()) {
            continue;
        }
        let stem = id.strip_suffix(&suffix).unwrap_or(id.as_str()).to_string();
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{stem}_{n}{suffix}");
            if !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        used.insert(unique.clone());
        *id = unique;
    }
}

fn agent_metrics(a: &AgentStat) -> BTreeMap<MetricKey, Option<f64>> {
    BTreeMap::from([
        (MetricKey::Aht, a.summary.avg_aht()),
        (MetricKey::Csat, a.summary.avg_csat()),
        (MetricKey::Fcr, a.summary.fcr_rate()),
    ])
}

/// Source of insights for the overview composer.
pub trait InsightSource {
    fn build(&self, input: &InsightInput<'_>) -> Result<InsightOutput>;
}

/// The fixed rule set under a given policy.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    pub policy: InsightPolicy,
}

impl RuleEngine {
    pub fn new(policy: InsightPolicy) -> Self {
        Self { policy }
    }
}

impl InsightSource for RuleEngine {
    fn build(&self, input: &InsightInput<'_>) -> Result<InsightOutput> {
        Ok(build_insights(input, &self.policy))
    }
}

/// No-op source: always empty arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInsights;

impl InsightSource for NoInsights {
    fn build(&self, _input: &InsightInput<'_>) -> Result<InsightOutput> {
        Ok(InsightOutput::default())
    }
}
