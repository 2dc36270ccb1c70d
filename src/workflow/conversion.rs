use super::definition::{Condition, WorkflowEdge, WorkflowGraph, WorkflowNode};
use crate::error::{KansaError, ParseError, read_document};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::path::Path;
use tracing::{debug, warn};

/// A trait for custom workflow formats that can be converted into a `WorkflowGraph`.
///
/// The built-in [`WorkflowDocument`] covers the YAML/JSON `graph:` format. Other
/// formats implement this trait to feed the same analyzers.
///
/// # Example
///
/// ```rust
/// use kansa::error::ParseError;
/// use kansa::workflow::{IntoWorkflow, WorkflowEdge, WorkflowGraph, WorkflowNode};
///
/// struct Pipeline { stages: Vec<String> }
///
/// impl IntoWorkflow for Pipeline {
///     fn into_workflow(self) -> Result<WorkflowGraph, ParseError> {
///         let mut graph = WorkflowGraph::new();
///         for stage in &self.stages {
///             graph.add_node(WorkflowNode::new(stage.as_str()));
///         }
///         for pair in self.stages.windows(2) {
///             graph.add_edge(WorkflowEdge::new(pair[0].as_str(), pair[1].as_str()));
///         }
///         Ok(graph)
///     }
/// }
///
/// let graph = Pipeline { stages: vec!["START".into(), "Draft".into()] }
///     .into_workflow()
///     .unwrap();
/// assert_eq!(graph.edge_count(), 1);
/// ```
pub trait IntoWorkflow {
    /// Consumes the object and converts it into a normalized workflow graph.
    fn into_workflow(self) -> Result<WorkflowGraph, ParseError>;
}

/// Source syntax of a workflow or configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Picks the format from a file extension, defaulting to YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }

    /// Guesses the format from the first meaningful character of the text.
    pub fn sniff(text: &str) -> Self {
        match text.trim_start().chars().next() {
            Some('{') | Some('[') => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DocumentFormat::Yaml => "YAML",
            DocumentFormat::Json => "JSON",
        }
    }
}

/// Parses text into a generic document tree in the given syntax.
pub(crate) fn parse_value(text: &str, format: DocumentFormat) -> Result<Value, ParseError> {
    let parsed = match format {
        DocumentFormat::Json => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str::<Value>(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ParseError::Syntax {
        format: format.name().to_string(),
        message,
    })
}

// --- Raw Deserialization Structs (Input Format Specific) ---
// Graph fields, nodes and edges are decoded one at a time so a single
// malformed value is skipped instead of failing the whole document.

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    node_type: Option<String>,
    context_window: Option<u64>,
    config: Option<RawNodeConfig>,
}

#[derive(Deserialize, Default)]
struct RawNodeConfig {
    provider: Option<String>,
    name: Option<String>,
    tooling: Option<Value>,
    role: Option<String>,
}

#[derive(Deserialize)]
struct RawEdge {
    from: String,
    to: String,
    trigger: Option<bool>,
    carry_data: Option<bool>,
    condition: Option<Value>,
}

/// A workflow definition document in the `graph:` format, parsed but not yet normalized.
#[derive(Debug, Clone)]
pub struct WorkflowDocument {
    root: Value,
}

impl WorkflowDocument {
    /// Parses the text, guessing JSON or YAML from its first character.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_as(text, DocumentFormat::sniff(text))
    }

    pub fn parse_as(text: &str, format: DocumentFormat) -> Result<Self, ParseError> {
        let root = parse_value(text, format)?;
        if !root.is_mapping() {
            return Err(ParseError::NotAMapping);
        }
        Ok(Self { root })
    }
}

impl IntoWorkflow for WorkflowDocument {
    fn into_workflow(self) -> Result<WorkflowGraph, ParseError> {
        let graph_value = self.root.get("graph").ok_or(ParseError::MissingGraph)?;
        if !graph_value.is_mapping() {
            return Err(ParseError::InvalidGraph(
                "expected a mapping with 'nodes' and 'edges'".to_string(),
            ));
        }
        let mut graph = WorkflowGraph::new();
        let mut notes = Vec::new();
        graph.id = graph_value.get("id").and_then(scalar_to_string);
        graph.description = graph_field(graph_value, "description", &mut notes);
        if let Some(max) = graph_field(graph_value, "max_iterations", &mut notes) {
            graph.max_iterations = max;
        }
        graph.declared_start = graph_field(graph_value, "start", &mut notes)
            .map(OneOrMany::into_vec)
            .unwrap_or_default();
        graph.declared_end = graph_field(graph_value, "end", &mut notes)
            .map(OneOrMany::into_vec)
            .unwrap_or_default();
        let nodes: Vec<Value> = graph_field(graph_value, "nodes", &mut notes).unwrap_or_default();
        let edges: Vec<Value> = graph_field(graph_value, "edges", &mut notes).unwrap_or_default();
        graph.parse_notes = notes;

        for (position, value) in nodes.into_iter().enumerate() {
            match serde_yaml::from_value::<RawNode>(value) {
                Ok(raw_node) => {
                    let node = convert_node(raw_node);
                    let id = node.id.clone();
                    if !graph.add_node(node) {
                        warn!(node = %id, "duplicate node definition ignored");
                    }
                }
                Err(e) => {
                    warn!(position, error = %e, "skipping malformed node entry");
                    graph
                        .parse_notes
                        .push(format!("Skipped malformed node entry #{}: {}", position + 1, e));
                }
            }
        }

        for (position, value) in edges.into_iter().enumerate() {
            match serde_yaml::from_value::<RawEdge>(value) {
                Ok(raw_edge) => graph.add_edge(WorkflowEdge {
                    from: raw_edge.from,
                    to: raw_edge.to,
                    trigger: raw_edge.trigger.unwrap_or(false),
                    carry_data: raw_edge.carry_data.unwrap_or(false),
                    condition: classify_condition(raw_edge.condition.as_ref()),
                }),
                Err(e) => {
                    warn!(position, error = %e, "skipping malformed edge entry");
                    graph
                        .parse_notes
                        .push(format!("Skipped malformed edge entry #{}: {}", position + 1, e));
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = graph.parse_notes.len(),
            "workflow graph normalized"
        );
        Ok(graph)
    }
}

/// Decodes one field of the `graph` mapping. A missing or null field is `None`;
/// a mistyped one is noted and also `None`, so its default applies.
fn graph_field<T: DeserializeOwned>(graph: &Value, key: &str, notes: &mut Vec<String>) -> Option<T> {
    let value = graph.get(key).filter(|v| !v.is_null())?;
    match serde_yaml::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(field = key, error = %e, "ignoring malformed graph field");
            notes.push(format!("Ignored malformed graph field '{}': {}", key, e));
            None
        }
    }
}

fn convert_node(raw: RawNode) -> WorkflowNode {
    let config = raw.config.unwrap_or_default();
    WorkflowNode {
        id: raw.id,
        node_type: raw.node_type.unwrap_or_else(|| "agent".to_string()),
        provider: config.provider.unwrap_or_else(|| "unknown".to_string()),
        model: config.name.unwrap_or_else(|| "unknown".to_string()),
        has_tools: config.tooling.is_some_and(|t| !t.is_null()),
        context_window: raw.context_window.unwrap_or(0),
        role: config.role,
    }
}

/// Maps a raw `condition` value onto the tagged [`Condition`] type.
pub fn classify_condition(value: Option<&Value>) -> Condition {
    let Some(value) = value else {
        return Condition::Missing;
    };
    match value {
        Value::Null => Condition::Missing,
        Value::Bool(true) => Condition::Always,
        Value::String(s) if s.eq_ignore_ascii_case("true") => Condition::Always,
        Value::Mapping(_) if value.get("type").and_then(Value::as_str) == Some("keyword") => {
            match value.get("config").and_then(|c| c.get("any")) {
                None | Some(Value::Null) => Condition::Keyword { any: Vec::new() },
                Some(Value::Sequence(items)) => {
                    let keywords: Option<Vec<String>> =
                        items.iter().map(|k| k.as_str().map(str::to_string)).collect();
                    match keywords {
                        Some(any) => Condition::Keyword { any },
                        None => Condition::Other {
                            raw: render_raw(value),
                        },
                    }
                }
                Some(_) => Condition::Other {
                    raw: render_raw(value),
                },
            }
        }
        other => Condition::Other {
            raw: render_raw(other),
        },
    }
}

fn render_raw(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses workflow text (YAML or JSON) into a normalized graph.
pub fn parse_workflow(text: &str) -> Result<WorkflowGraph, ParseError> {
    WorkflowDocument::parse(text)?.into_workflow()
}

/// Reads and parses a workflow file. The format follows the file extension.
pub fn load_workflow(path: impl AsRef<Path>) -> Result<WorkflowGraph, KansaError> {
    let path = path.as_ref();
    let text = read_document(path)?;
    let graph = WorkflowDocument::parse_as(&text, DocumentFormat::from_path(path))?.into_workflow()?;
    Ok(graph)
}
