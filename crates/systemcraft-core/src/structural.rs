use serde::{Deserialize, Serialize};

use crate::rules::{Rule, RuleInput, Severity, RULES};
use crate::{Connection, Node};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Pass,
    Fail,
}

/// One rule's outcome, keyed by the rule's display description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct RuleResult {
    pub rule: String,
    pub status: RuleStatus,
    pub message: String,
    pub severity: Severity,
}

impl RuleResult {
    pub fn passed(&self) -> bool {
        self.status == RuleStatus::Pass
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructuralEvaluation {
    /// Weighted share of passing rules, 0..=100.
    pub score: u32,
    pub passed_rules: Vec<String>,
    pub failed_rules: Vec<String>,
    pub details: Vec<RuleResult>,
}

/// Run the standard rule catalog against a design.
pub fn evaluate_structure(
    nodes: &[Node],
    connections: &[Connection],
    requirements: &[String],
    constraints: &[String],
) -> StructuralEvaluation {
    evaluate_with_rules(RULES, nodes, connections, requirements, constraints)
}

/// Run an arbitrary ordered catalog. An empty catalog scores 0.
pub fn evaluate_with_rules(
    rules: &[Rule],
    nodes: &[Node],
    connections: &[Connection],
    requirements: &[String],
    constraints: &[String],
) -> StructuralEvaluation {
    let input = RuleInput {
        nodes,
        connections,
        requirements,
        constraints,
    };

    let mut details = Vec::with_capacity(rules.len());
    let mut total_weight: u64 = 0;
    let mut earned_weight: u64 = 0;

    for rule in rules {
        let verdict = (rule.check)(&input);
        tracing::debug!(rule = rule.id, pass = verdict.pass, "rule evaluated");

        total_weight += u64::from(rule.weight);
        if verdict.pass {
            earned_weight += u64::from(rule.weight);
        }
        details.push(RuleResult {
            rule: rule.description.to_string(),
            status: if verdict.pass {
                RuleStatus::Pass
            } else {
                RuleStatus::Fail
            },
            message: verdict.message,
            severity: rule.severity,
        });
    }

    let score = weighted_percent(earned_weight, total_weight);
    let (passed, failed): (Vec<&RuleResult>, Vec<&RuleResult>) =
        details.iter().partition(|d| d.passed());

    StructuralEvaluation {
        score,
        passed_rules: passed.into_iter().map(|d| d.rule.clone()).collect(),
        failed_rules: failed.into_iter().map(|d| d.rule.clone()).collect(),
        details,
    }
}

/// round(100 * earned / total), halves rounded up.
fn weighted_percent(earned: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((earned as f64 / total as f64) * 100.0).round() as u32
}
