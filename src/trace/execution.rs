use super::model::{EventKind, ExecutionTrace};
use crate::config::VerificationRule;
use serde::{Deserialize, Serialize};

const ERROR_CONTENT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeError {
    pub node: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub node: String,
    /// The offending content, cut to its first 100 characters.
    pub content: String,
}

/// Health of a single recorded run, independent of any loop analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAudit {
    /// Distinct completed nodes, in order of first completion.
    pub nodes_executed: Vec<String>,
    pub errors: Vec<NodeError>,
    pub error_outputs: Vec<ErrorOutput>,
    pub verification_issues: Vec<String>,
    pub iterations: u32,
    pub hit_iteration_cap: bool,
    pub issues: Vec<String>,
    pub is_clean: bool,
}

impl ExecutionAudit {
    /// Scans the log for node errors and error outputs, applies the optional
    /// verification rule to node outputs and checks the iteration cap.
    pub fn from_trace(
        trace: &ExecutionTrace,
        verification: Option<&VerificationRule>,
        max_iterations: u32,
    ) -> Self {
        let mut audit = ExecutionAudit {
            iterations: trace.iterations,
            ..Default::default()
        };

        for entry in &trace.execution_log {
            match entry.kind() {
                EventKind::NodeComplete => {
                    if !audit.nodes_executed.contains(&entry.node_id) {
                        audit.nodes_executed.push(entry.node_id.clone());
                    }
                }
                EventKind::NodeError => audit.errors.push(NodeError {
                    node: entry.node_id.clone(),
                    error: entry.detail("error").map(str::to_string),
                }),
                EventKind::ErrorOutputDetected => audit.error_outputs.push(ErrorOutput {
                    node: entry.node_id.clone(),
                    content: entry
                        .detail("error_content")
                        .unwrap_or_default()
                        .chars()
                        .take(ERROR_CONTENT_LIMIT)
                        .collect(),
                }),
                _ => {}
            }
        }

        if let Some(rule) = verification {
            for (node, outputs) in &trace.node_outputs {
                if !node.contains(&rule.node_contains) {
                    continue;
                }
                for output in outputs {
                    if !output.content.contains(&rule.marker) {
                        audit
                            .verification_issues
                            .push(format!("{}: May not have used {}", node, rule.marker));
                    }
                }
            }
        }

        audit.hit_iteration_cap = max_iterations > 0 && trace.iterations >= max_iterations;

        for error in &audit.errors {
            audit.issues.push(format!(
                "Node error: {} - {}",
                error.node,
                error.error.as_deref().unwrap_or("unknown error")
            ));
        }
        audit.issues.extend(audit.verification_issues.iter().cloned());
        if audit.hit_iteration_cap {
            audit.issues.push(format!(
                "Hit max iterations ({}) - possible infinite loop",
                trace.iterations
            ));
        }
        audit.is_clean = audit.issues.is_empty();
        audit
    }
}
