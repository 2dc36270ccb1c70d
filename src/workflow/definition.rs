use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Node id that anchors reachability when a workflow declares it.
pub const START_NODE: &str = "START";

/// The canonical, normalized form of a workflow graph, ready for auditing.
/// This is the target structure for any custom workflow format conversion.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    pub id: Option<String>,
    pub description: Option<String>,
    pub max_iterations: u32,
    /// Explicitly declared entry nodes, if the document lists any.
    pub declared_start: Vec<String>,
    /// Explicitly declared terminal nodes, if the document lists any.
    pub declared_end: Vec<String>,
    nodes: Vec<WorkflowNode>,
    index: AHashMap<String, usize>,
    pub edges: Vec<WorkflowEdge>,
    /// Ids that were defined more than once. Only the first definition is kept.
    pub duplicate_nodes: Vec<String>,
    /// Entries that were skipped because they could not be read.
    pub parse_notes: Vec<String>,
}

/// A single stage of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    pub node_type: String,
    pub provider: String,
    pub model: String,
    pub has_tools: bool,
    pub context_window: u64,
    /// The prompt or role text, used to check that routing keywords are mentioned.
    pub role: Option<String>,
}

impl WorkflowNode {
    /// A node with the defaults a workflow document implies when fields are omitted.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: "agent".to_string(),
            provider: "unknown".to_string(),
            model: "unknown".to_string(),
            has_tools: false,
            context_window: 0,
            role: None,
        }
    }

    pub fn with_provider(mut self, provider: &str, model: &str) -> Self {
        self.provider = provider.to_string();
        self.model = model.to_string();
        self
    }
}

/// A directed transition between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowEdge {
    pub from: String,
    pub to: String,
    pub trigger: bool,
    pub carry_data: bool,
    pub condition: Condition,
}

impl WorkflowEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            trigger: false,
            carry_data: false,
            condition: Condition::Always,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn label(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

/// The routing predicate attached to an edge. Inspected, never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Unconditional routing (`true` or `"true"`).
    Always,
    /// Routes when any of the keywords appears in the source node's output.
    Keyword { any: Vec<String> },
    /// No condition was given.
    Missing,
    /// A structured condition of a kind the auditor does not recognise.
    Other { raw: String },
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self {
            max_iterations: 20,
            ..Default::default()
        }
    }

    /// Adds a node, keeping the first definition when the id is already taken.
    /// Returns `false` for a duplicate.
    pub fn add_node(&mut self, node: WorkflowNode) -> bool {
        if self.index.contains_key(&node.id) {
            if !self.duplicate_nodes.contains(&node.id) {
                self.duplicate_nodes.push(node.id.clone());
            }
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn add_edge(&mut self, edge: WorkflowEdge) {
        self.edges.push(edge);
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
