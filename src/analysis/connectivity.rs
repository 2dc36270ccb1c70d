use super::{GraphAnalyzer, list};
use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::{AnalysisError, EdgeSide, ReferenceError};
use crate::workflow::{START_NODE, WorkflowGraph};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use tracing::debug;

/// Reachability and reference findings for a workflow graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connectivity {
    /// Nodes with no incoming edge.
    pub start_nodes: Vec<String>,
    /// Nodes with no outgoing edge.
    pub end_nodes: Vec<String>,
    /// Nodes with neither.
    pub orphan_nodes: Vec<String>,
    pub unreachable_nodes: Vec<String>,
    /// Ids referenced by edges but never defined.
    pub missing_nodes: Vec<String>,
    pub reference_errors: Vec<ReferenceError>,
    pub reachable_count: usize,
}

/// Computes start/end/orphan/unreachable/missing node sets.
///
/// Outgoing adjacency is keyed by declared sources and incoming adjacency by
/// declared targets, so an edge into an undefined node still counts as an
/// outgoing edge of its (defined) source. Reachability is a breadth-first walk
/// from `START` when the graph declares it, otherwise from every start node.
pub fn analyze_connectivity(graph: &WorkflowGraph) -> Connectivity {
    let mut outgoing: AHashMap<&str, Vec<&str>> =
        graph.node_ids().map(|id| (id, Vec::new())).collect();
    let mut incoming: AHashMap<&str, Vec<&str>> =
        graph.node_ids().map(|id| (id, Vec::new())).collect();
    let mut missing_nodes: Vec<String> = Vec::new();
    let mut reference_errors = Vec::new();

    for edge in &graph.edges {
        for (id, side) in [(&edge.from, EdgeSide::Source), (&edge.to, EdgeSide::Target)] {
            if graph.contains(id) {
                continue;
            }
            reference_errors.push(ReferenceError {
                from: edge.from.clone(),
                to: edge.to.clone(),
                side,
                missing_node_id: id.clone(),
            });
            if !missing_nodes.contains(id) {
                missing_nodes.push(id.clone());
            }
        }
        if let Some(targets) = outgoing.get_mut(edge.from.as_str()) {
            targets.push(edge.to.as_str());
        }
        if let Some(sources) = incoming.get_mut(edge.to.as_str()) {
            sources.push(edge.from.as_str());
        }
    }

    let has_any =
        |map: &AHashMap<&str, Vec<&str>>, id: &str| map.get(id).is_some_and(|v| !v.is_empty());

    let mut connectivity = Connectivity::default();
    for id in graph.node_ids() {
        let has_out = has_any(&outgoing, id);
        let has_in = has_any(&incoming, id);
        if !has_out {
            connectivity.end_nodes.push(id.to_string());
        }
        if !has_in {
            connectivity.start_nodes.push(id.to_string());
        }
        if !has_out && !has_in {
            connectivity.orphan_nodes.push(id.to_string());
        }
    }

    let mut queue: VecDeque<&str> = if graph.contains(START_NODE) {
        VecDeque::from([START_NODE])
    } else {
        connectivity.start_nodes.iter().map(String::as_str).collect()
    };
    let mut reachable: AHashSet<&str> = AHashSet::new();
    while let Some(node) = queue.pop_front() {
        if reachable.insert(node) {
            if let Some(next) = outgoing.get(node) {
                queue.extend(next.iter().copied());
            }
        }
    }

    connectivity.unreachable_nodes = graph
        .node_ids()
        .filter(|id| !reachable.contains(id) && *id != START_NODE)
        .map(str::to_string)
        .collect();
    connectivity.reachable_count = graph.node_ids().filter(|id| reachable.contains(id)).count();
    connectivity.missing_nodes = missing_nodes;
    connectivity.reference_errors = reference_errors;
    connectivity
}

/// Reports orphans as warnings, unreachable and undefined nodes as critical.
pub struct ConnectivityAnalyzer;

impl GraphAnalyzer for ConnectivityAnalyzer {
    fn name(&self) -> &str {
        "connectivity"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        _config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError> {
        let connectivity = analyze_connectivity(graph);
        debug!(
            reachable = connectivity.reachable_count,
            total = graph.node_count(),
            "connectivity computed"
        );
        for error in &connectivity.reference_errors {
            debug!(%error, "broken edge reference");
        }

        if !connectivity.orphan_nodes.is_empty() {
            report
                .warnings
                .push(format!("Orphan nodes found: {}", list(&connectivity.orphan_nodes)));
        }
        if !connectivity.unreachable_nodes.is_empty() {
            report.critical_issues.push(format!(
                "Unreachable nodes: {}",
                list(&connectivity.unreachable_nodes)
            ));
            report.recommendations.push(format!(
                "Connect {} unreachable nodes to the workflow or remove them",
                connectivity.unreachable_nodes.len()
            ));
        }
        if !connectivity.missing_nodes.is_empty() {
            report.critical_issues.push(format!(
                "Missing node definitions: {}",
                list(&connectivity.missing_nodes)
            ));
            report.recommendations.push(format!(
                "Fix {} edges referencing non-existent nodes",
                connectivity.reference_errors.len()
            ));
        }

        report.start_nodes = connectivity.start_nodes;
        report.end_nodes = connectivity.end_nodes;
        report.orphan_nodes = connectivity.orphan_nodes;
        report.unreachable_nodes = connectivity.unreachable_nodes;
        report.missing_nodes = connectivity.missing_nodes;
        Ok(())
    }
}
