use super::{GraphAnalyzer, list};
use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::AnalysisError;
use crate::workflow::{START_NODE, WorkflowGraph};
use ahash::{AHashMap, AHashSet};

/// Structural hygiene findings beyond plain connectivity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureCheck {
    /// Declared start/end nodes that are not defined.
    pub undefined_declared: Vec<String>,
    /// Nodes without outgoing edges that are not declared as end nodes.
    pub dead_end_nodes: Vec<String>,
    /// Nodes that no trigger edge activates.
    pub untriggered_nodes: Vec<String>,
    /// Nodes whose in-degree exceeds the configured limit.
    pub high_in_degree: Vec<(String, usize)>,
}

/// Checks declared entry/exit points, dead ends, trigger coverage and in-degree.
///
/// Dead ends are only meaningful when the graph declares its end nodes, and
/// trigger coverage only when at least one edge is a trigger edge; otherwise
/// those checks are skipped. `passthrough` nodes are never dead ends.
pub fn check_structure(graph: &WorkflowGraph, max_in_degree: usize) -> StructureCheck {
    let mut check = StructureCheck::default();

    for declared in graph.declared_start.iter().chain(&graph.declared_end) {
        if !graph.contains(declared) && !check.undefined_declared.contains(declared) {
            check.undefined_declared.push(declared.clone());
        }
    }

    if !graph.declared_end.is_empty() {
        let has_outgoing: AHashSet<&str> = graph.edges.iter().map(|e| e.from.as_str()).collect();
        check.dead_end_nodes = graph
            .nodes()
            .iter()
            .filter(|n| {
                !has_outgoing.contains(n.id.as_str())
                    && !graph.declared_end.contains(&n.id)
                    && n.node_type != "passthrough"
            })
            .map(|n| n.id.clone())
            .collect();
    }

    if graph.edges.iter().any(|e| e.trigger) {
        let mut triggered: AHashSet<&str> = graph
            .edges
            .iter()
            .filter(|e| e.trigger)
            .map(|e| e.to.as_str())
            .collect();
        if graph.declared_start.is_empty() {
            triggered.insert(START_NODE);
        } else {
            triggered.extend(graph.declared_start.iter().map(String::as_str));
        }
        check.untriggered_nodes = graph
            .node_ids()
            .filter(|id| !triggered.contains(id))
            .map(str::to_string)
            .collect();
    }

    let mut in_degree: AHashMap<&str, usize> = AHashMap::new();
    for edge in &graph.edges {
        *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
    }
    for id in graph.node_ids() {
        let degree = in_degree.get(id).copied().unwrap_or(0);
        if degree > max_in_degree {
            check.high_in_degree.push((id.to_string(), degree));
        }
    }

    check
}

/// Adds structural hygiene warnings to the report.
pub struct StructureAnalyzer;

impl GraphAnalyzer for StructureAnalyzer {
    fn name(&self) -> &str {
        "structure"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError> {
        let check = check_structure(graph, config.max_in_degree);

        for declared in &check.undefined_declared {
            report
                .warnings
                .push(format!("Declared start/end node '{}' not found in nodes", declared));
        }
        if !check.dead_end_nodes.is_empty() {
            report
                .warnings
                .push(format!("Dead-end nodes: {}", list(&check.dead_end_nodes)));
            report.recommendations.push(format!(
                "Add outgoing edges from {} dead-end nodes",
                check.dead_end_nodes.len()
            ));
        }
        if !check.untriggered_nodes.is_empty() {
            report.warnings.push(format!(
                "Nodes without trigger edges: {}",
                list(&check.untriggered_nodes)
            ));
            report.recommendations.push(format!(
                "Add trigger edges to {} nodes",
                check.untriggered_nodes.len()
            ));
        }
        for (id, degree) in &check.high_in_degree {
            report.warnings.push(format!(
                "{}: High in-degree ({}) - may cause context overflow or timing issues",
                id, degree
            ));
        }
        Ok(())
    }
}
