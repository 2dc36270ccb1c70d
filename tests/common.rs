//! Common test utilities for building workflows and execution traces.
use kansa::prelude::*;
use kansa::trace::{LogEntry, NodeOutput};
use serde_json::json;

/// Builds a graph from node ids and `(from, to)` pairs with unconditional edges.
#[allow(dead_code)]
pub fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> WorkflowGraph {
    let mut graph = WorkflowGraph::new();
    for id in nodes {
        graph.add_node(WorkflowNode::new(*id));
    }
    for (from, to) in edges {
        graph.add_edge(WorkflowEdge::new(*from, *to));
    }
    graph
}

/// A small review workflow with one feedback loop.
///
/// `START -> Draft -> Review -> Publish`, plus `Review -> Draft` on "REVISE".
#[allow(dead_code)]
pub const REVIEW_WORKFLOW: &str = r#"
graph:
  id: review_flow
  max_iterations: 10
  nodes:
    - id: START
      type: passthrough
    - id: Draft
      context_window: 64000
      config:
        provider: openai
        name: gpt-4o
        tooling: [search]
        role: Write the draft.
    - id: Review
      config:
        provider: anthropic
        name: claude
        role: Review the draft and answer REVISE or APPROVE.
    - id: Publish
      config:
        provider: google
        name: gemini
  edges:
    - { from: START, to: Draft, condition: true }
    - { from: Draft, to: Review, condition: "true" }
    - from: Review
      to: Draft
      condition: { type: keyword, config: { any: [REVISE] } }
    - from: Review
      to: Publish
      condition: { type: keyword, config: { any: [APPROVE] } }
"#;

/// The same workflow as [`REVIEW_WORKFLOW`], written as JSON.
#[allow(dead_code)]
pub fn review_workflow_json() -> String {
    json!({
        "graph": {
            "id": "review_flow",
            "max_iterations": 10,
            "nodes": [
                { "id": "START", "type": "passthrough" },
                { "id": "Draft", "context_window": 64000,
                  "config": { "provider": "openai", "name": "gpt-4o", "tooling": ["search"],
                              "role": "Write the draft." } },
                { "id": "Review",
                  "config": { "provider": "anthropic", "name": "claude",
                              "role": "Review the draft and answer REVISE or APPROVE." } },
                { "id": "Publish", "config": { "provider": "google", "name": "gemini" } }
            ],
            "edges": [
                { "from": "START", "to": "Draft", "condition": true },
                { "from": "Draft", "to": "Review", "condition": "true" },
                { "from": "Review", "to": "Draft",
                  "condition": { "type": "keyword", "config": { "any": ["REVISE"] } } },
                { "from": "Review", "to": "Publish",
                  "condition": { "type": "keyword", "config": { "any": ["APPROVE"] } } }
            ]
        }
    })
    .to_string()
}

#[allow(dead_code)]
pub fn entry(iteration: i64, event: &str, node: &str) -> LogEntry {
    LogEntry {
        iteration,
        event: event.to_string(),
        node_id: node.to_string(),
        details: serde_json::Value::Null,
        timestamp: None,
    }
}

#[allow(dead_code)]
pub fn output(content: &str) -> NodeOutput {
    NodeOutput {
        content: content.to_string(),
        timestamp: None,
    }
}

/// A trace whose iterations complete the given node sequences, in order.
#[allow(dead_code)]
pub fn trace_with_sequences(sequences: &[&[&str]]) -> ExecutionTrace {
    let mut trace = ExecutionTrace::default();
    for (i, sequence) in sequences.iter().enumerate() {
        for node in *sequence {
            trace
                .execution_log
                .push(entry(i as i64 + 1, "node_complete", node));
        }
    }
    trace.iterations = sequences.len() as u32;
    trace
}

/// Adds one output per content string for `node`.
#[allow(dead_code)]
pub fn with_outputs(mut trace: ExecutionTrace, node: &str, contents: &[&str]) -> ExecutionTrace {
    trace
        .node_outputs
        .entry(node.to_string())
        .or_default()
        .extend(contents.iter().map(|c| output(c)));
    trace
}

/// Diagnosis vocabulary matching [`REVIEW_WORKFLOW`].
#[allow(dead_code)]
pub fn review_diagnosis_config() -> DiagnosisConfig {
    DiagnosisConfig::default()
        .with_terminal_node("Publish")
        .with_feedback_pair("Review", "Draft")
        .with_convergence("Draft", "score")
        .with_routing_rule(
            RoutingRule::new("Review")
                .marker("approve", "ROUTE: Publish")
                .marker("revise", "ROUTE: Draft"),
        )
}
