use super::GraphAnalyzer;
use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::AnalysisError;
use crate::workflow::{Condition, WorkflowGraph};
use serde::{Deserialize, Serialize};

/// How many edges carry each kind of condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionStats {
    pub always: usize,
    pub keyword: usize,
    pub missing: usize,
    pub other: usize,
}

/// Result of validating every edge condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionCheck {
    pub stats: ConditionStats,
    /// Missing and empty keyword conditions.
    pub issues: Vec<String>,
    /// Keywords the source node's role never mentions.
    pub prompt_mismatches: Vec<String>,
}

/// Classifies each edge's condition and flags the ill-formed ones.
///
/// `Other` conditions are counted but not penalized. With `check_prompts`, each
/// keyword of a keyword condition must appear (case-insensitively) in the role
/// text of the source node, when that node declares one.
pub fn check_conditions(graph: &WorkflowGraph, check_prompts: bool) -> ConditionCheck {
    let mut check = ConditionCheck::default();

    for edge in &graph.edges {
        match &edge.condition {
            Condition::Always => check.stats.always += 1,
            Condition::Missing => {
                check.stats.missing += 1;
                check
                    .issues
                    .push(format!("Edge {}: Missing condition", edge.label()));
            }
            Condition::Other { .. } => check.stats.other += 1,
            Condition::Keyword { any } => {
                check.stats.keyword += 1;
                if any.is_empty() {
                    check
                        .issues
                        .push(format!("Edge {}: Empty keyword condition", edge.label()));
                    continue;
                }
                if !check_prompts {
                    continue;
                }
                let role = graph
                    .node(&edge.from)
                    .and_then(|n| n.role.as_deref())
                    .filter(|r| !r.trim().is_empty());
                if let Some(role) = role {
                    let role = role.to_lowercase();
                    for keyword in any {
                        if !role.contains(&keyword.to_lowercase()) {
                            check.prompt_mismatches.push(format!(
                                "Edge {}: keyword '{}' not mentioned in node prompt",
                                edge.label(),
                                keyword
                            ));
                        }
                    }
                }
            }
        }
    }

    check
}

/// Adds condition warnings and statistics to the report.
pub struct ConditionValidator;

impl GraphAnalyzer for ConditionValidator {
    fn name(&self) -> &str {
        "conditions"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError> {
        let check = check_conditions(graph, config.check_keyword_prompts);
        report.warnings.extend(check.issues);
        if !check.prompt_mismatches.is_empty() {
            report.warnings.extend(check.prompt_mismatches);
            report
                .recommendations
                .push("Update node prompts to include their routing keywords".to_string());
        }
        report.condition_stats = check.stats;
        Ok(())
    }
}
