use super::GraphAnalyzer;
use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::AnalysisError;
use crate::workflow::WorkflowGraph;
use ahash::AHashMap;
use tracing::{debug, warn};

/// Cycles found in a workflow graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleScan {
    /// Each cycle starts and ends with the same node id.
    pub cycles: Vec<Vec<String>>,
    /// Enumeration stopped at the configured limit.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

/// Enumerates cycles with a three-color depth-first search.
///
/// Roots are tried in declaration order and neighbors in edge order; edges into
/// undefined nodes are ignored. Reaching an in-progress node records the current
/// path from that node's first occurrence, closed by the repeated node.
///
/// The walk keeps an explicit stack instead of recursing, so deep graphs do not
/// exhaust the call stack. Enumeration is still O(V·E) in the worst case, which
/// is why `max_cycles` (0 for no limit) bounds it.
pub fn detect_cycles(graph: &WorkflowGraph, max_cycles: usize) -> CycleScan {
    let ids: Vec<&str> = graph.node_ids().collect();
    let position: AHashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for edge in &graph.edges {
        if let (Some(&from), Some(&to)) = (
            position.get(edge.from.as_str()),
            position.get(edge.to.as_str()),
        ) {
            adjacency[from].push(to);
        }
    }

    let mut color = vec![Color::Unvisited; ids.len()];
    let mut scan = CycleScan::default();

    'roots: for root in 0..ids.len() {
        if color[root] != Color::Unvisited {
            continue;
        }
        color[root] = Color::InProgress;
        // (node, index of the next neighbor to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        let mut path: Vec<usize> = vec![root];

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            if cursor >= adjacency[node].len() {
                color[node] = Color::Done;
                stack.pop();
                path.pop();
                continue;
            }
            frame.1 += 1;

            let next = adjacency[node][cursor];
            match color[next] {
                Color::InProgress => {
                    if max_cycles > 0 && scan.cycles.len() == max_cycles {
                        scan.truncated = true;
                        break 'roots;
                    }
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&n| ids[n].to_string()).collect();
                    cycle.push(ids[next].to_string());
                    scan.cycles.push(cycle);
                }
                Color::Unvisited => {
                    color[next] = Color::InProgress;
                    stack.push((next, 0));
                    path.push(next);
                }
                Color::Done => {}
            }
        }
    }

    scan
}

/// Records cycles as informational findings. Feedback loops are often intentional.
pub struct CycleDetector;

impl GraphAnalyzer for CycleDetector {
    fn name(&self) -> &str {
        "cycles"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError> {
        let scan = detect_cycles(graph, config.max_cycles);
        debug!(cycles = scan.cycles.len(), "cycle scan finished");

        if !scan.cycles.is_empty() {
            report.warnings.push(format!(
                "{} cycles detected (may be intentional for feedback loops)",
                scan.cycles.len()
            ));
        }
        if scan.truncated {
            warn!(limit = config.max_cycles, "cycle enumeration truncated");
            report.warnings.push(format!(
                "Cycle enumeration stopped after {} cycles",
                config.max_cycles
            ));
        }
        report.cycles = scan.cycles;
        Ok(())
    }
}
