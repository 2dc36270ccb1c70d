use crate::error::{KansaError, ParseError, read_document};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A recorded run of a workflow: the event log and every node's outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    #[serde(default = "unknown_ticker", deserialize_with = "ticker_or_unknown")]
    pub ticker: String,
    #[serde(default)]
    pub verified_price: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub iterations: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub execution_log: Vec<LogEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_outputs: BTreeMap<String, Vec<NodeOutput>>,
}

fn unknown_ticker() -> String {
    "UNKNOWN".to_string()
}

fn ticker_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_ticker))
}

/// Treats an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for ExecutionTrace {
    fn default() -> Self {
        Self {
            ticker: unknown_ticker(),
            verified_price: None,
            iterations: 0,
            execution_log: Vec::new(),
            node_outputs: BTreeMap::new(),
        }
    }
}

impl ExecutionTrace {
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(|e| ParseError::Syntax {
            format: "JSON".to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KansaError> {
        let text = read_document(path.as_ref())?;
        Ok(Self::from_json(&text)?)
    }

    /// Outputs recorded for a node, oldest first. Empty when the node never ran.
    pub fn outputs(&self, node: &str) -> &[NodeOutput] {
        self.node_outputs.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn execution_count(&self, node: &str) -> usize {
        self.outputs(node).len()
    }

    /// Whether the node produced at least one output. An empty entry does not count.
    pub fn reached(&self, node: &str) -> bool {
        self.execution_count(node) > 0
    }
}

/// One line of the execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub iteration: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_id: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LogEntry {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.event)
    }

    /// A string field of `details`, if present.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }
}

/// Known execution log events. Anything else is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NodeComplete,
    NodeTriggered,
    NodeError,
    EdgeConditionFailed,
    ErrorOutputDetected,
    Unknown,
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "node_complete" => EventKind::NodeComplete,
            "node_triggered" => EventKind::NodeTriggered,
            "node_error" => EventKind::NodeError,
            "edge_condition_failed" => EventKind::EdgeConditionFailed,
            "error_output_detected" => EventKind::ErrorOutputDetected,
            _ => EventKind::Unknown,
        }
    }

    /// Events that describe how control moved through the graph.
    pub fn is_control_flow(self) -> bool {
        matches!(
            self,
            EventKind::NodeComplete | EventKind::NodeTriggered | EventKind::EdgeConditionFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}
