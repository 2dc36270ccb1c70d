use super::timeline::IterationTimeline;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A sequence of completed nodes that recurred exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopPattern {
    /// 1-based position of the first group with this sequence.
    pub first_occurrence: usize,
    /// 1-based position of the repeat.
    pub repeated_at: usize,
    pub first_iteration: i64,
    pub repeated_iteration: i64,
    pub nodes: Vec<String>,
}

/// Finds timeline groups whose completed-node sequence matches an earlier group.
///
/// Every repeat is reported against the first occurrence of its sequence. Only
/// exact matches count: a loop that varies its path slightly is not detected.
/// Groups with no completed nodes share the empty sequence and are compared too.
pub fn detect_loops(timeline: &IterationTimeline) -> Vec<LoopPattern> {
    let mut seen: AHashMap<Vec<&str>, usize> = AHashMap::new();
    let mut patterns = Vec::new();

    for (position, group) in timeline.groups.iter().enumerate() {
        let sequence = group.completed_nodes();
        match seen.get(&sequence) {
            Some(&first) => patterns.push(LoopPattern {
                first_occurrence: first + 1,
                repeated_at: position + 1,
                first_iteration: timeline.groups[first].iteration,
                repeated_iteration: group.iteration,
                nodes: sequence.iter().map(|n| n.to_string()).collect(),
            }),
            None => {
                seen.insert(sequence, position);
            }
        }
    }

    patterns
}
