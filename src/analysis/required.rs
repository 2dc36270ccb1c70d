use super::GraphAnalyzer;
use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::AnalysisError;
use crate::workflow::WorkflowGraph;

/// Required node ids that the graph does not define, in configured order.
pub fn missing_required_nodes(graph: &WorkflowGraph, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|id| !graph.contains(id))
        .cloned()
        .collect()
}

/// Flags every configured required node that is absent as critical.
pub struct RequiredNodesCheck;

impl GraphAnalyzer for RequiredNodesCheck {
    fn name(&self) -> &str {
        "required-nodes"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError> {
        for missing in missing_required_nodes(graph, &config.required_nodes) {
            report
                .critical_issues
                .push(format!("Missing required node: {}", missing));
        }
        Ok(())
    }
}
