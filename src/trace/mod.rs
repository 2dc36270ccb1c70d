//! Execution traces and the structure recovered from their event logs.

pub mod execution;
pub mod formatter;
pub mod loops;
mod model;
pub mod timeline;

pub use execution::{ErrorOutput, ExecutionAudit, NodeError};
pub use formatter::ReportFormatter;
pub use loops::{LoopPattern, detect_loops};
pub use model::{EventKind, ExecutionTrace, LogEntry, NodeOutput};
pub use timeline::{IterationGroup, IterationTimeline, TimelineEvent};
