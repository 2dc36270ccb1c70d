use super::model::{EventKind, ExecutionTrace};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event: EventKind,
    pub node: String,
    pub from: String,
    pub to: String,
}

/// The control-flow events of one contiguous run of log entries sharing an iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationGroup {
    pub iteration: i64,
    pub events: Vec<TimelineEvent>,
}

impl IterationGroup {
    /// Ids of the nodes completed in this group, in log order.
    pub fn completed_nodes(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.event == EventKind::NodeComplete)
            .map(|e| e.node.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationTimeline {
    pub groups: Vec<IterationGroup>,
}

impl IterationTimeline {
    /// Groups consecutive log entries by iteration.
    ///
    /// A new group starts whenever the iteration value changes, so an iteration
    /// that reappears later in the log forms a separate group. Only control-flow
    /// events are kept, and groups left empty are dropped.
    pub fn from_trace(trace: &ExecutionTrace) -> Self {
        let mut groups: Vec<IterationGroup> = Vec::new();
        let mut current: Option<IterationGroup> = None;

        for entry in &trace.execution_log {
            if current.as_ref().is_none_or(|g| g.iteration != entry.iteration) {
                if let Some(group) = current.take() {
                    if !group.events.is_empty() {
                        groups.push(group);
                    }
                }
                current = Some(IterationGroup {
                    iteration: entry.iteration,
                    events: Vec::new(),
                });
            }

            let kind = entry.kind();
            if !kind.is_control_flow() {
                continue;
            }
            if let Some(group) = current.as_mut() {
                group.events.push(TimelineEvent {
                    event: kind,
                    node: entry.node_id.clone(),
                    from: entry.detail("from").unwrap_or_default().to_string(),
                    to: entry.detail("to").unwrap_or_default().to_string(),
                });
            }
        }

        if let Some(group) = current {
            if !group.events.is_empty() {
                groups.push(group);
            }
        }
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
