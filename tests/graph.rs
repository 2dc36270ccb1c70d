//! Tests for workflow parsing and the individual structural analyzers.
mod common;
use common::*;
use kansa::analysis::*;
use kansa::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_parse_review_workflow() {
    let graph = parse_workflow(REVIEW_WORKFLOW).expect("Failed to parse workflow");

    assert_eq!(graph.id.as_deref(), Some("review_flow"));
    assert_eq!(graph.max_iterations, 10);
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 4);

    let start = graph.node("START").unwrap();
    assert_eq!(start.node_type, "passthrough");
    assert_eq!(start.provider, "unknown");
    assert_eq!(start.model, "unknown");

    let draft = graph.node("Draft").unwrap();
    assert_eq!(draft.provider, "openai");
    assert_eq!(draft.model, "gpt-4o");
    assert!(draft.has_tools);
    assert_eq!(draft.context_window, 64000);
    assert!(!graph.node("Review").unwrap().has_tools);
}

#[test]
fn test_yaml_and_json_parse_identically() {
    let from_yaml = parse_workflow(REVIEW_WORKFLOW).unwrap();
    let from_json = parse_workflow(&review_workflow_json()).unwrap();

    assert_eq!(from_yaml.nodes(), from_json.nodes());
    assert_eq!(from_yaml.edges, from_json.edges);
    assert_eq!(from_yaml.id, from_json.id);
}

#[test]
fn test_condition_classification() {
    let graph = parse_workflow(REVIEW_WORKFLOW).unwrap();
    assert_eq!(graph.edges[0].condition, Condition::Always);
    assert_eq!(graph.edges[1].condition, Condition::Always);
    assert_eq!(
        graph.edges[2].condition,
        Condition::Keyword {
            any: vec!["REVISE".to_string()]
        }
    );
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        parse_workflow("- just\n- a list\n"),
        Err(ParseError::NotAMapping)
    ));
    assert!(matches!(
        parse_workflow("name: no graph here\n"),
        Err(ParseError::MissingGraph)
    ));
    assert!(matches!(
        parse_workflow("graph: [1, 2]\n"),
        Err(ParseError::InvalidGraph(_))
    ));
    assert!(matches!(
        parse_workflow("graph: {nodes: [\n"),
        Err(ParseError::Syntax { .. })
    ));
}

#[test]
fn test_malformed_entries_are_skipped() {
    let text = r#"
graph:
  nodes:
    - id: A
    - type: agent
  edges:
    - { from: A, to: A, condition: true }
    - { to: A }
"#;
    let graph = parse_workflow(text).unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.parse_notes.len(), 2);
}

#[test]
fn test_mistyped_graph_fields_fall_back_to_defaults() {
    let text = r#"
graph:
  description: [not, a, string]
  max_iterations: twenty
  start: { first: A }
  nodes:
    - id: A
  edges:
    - { from: A, to: Z }
"#;
    let graph = parse_workflow(text).unwrap();

    assert_eq!(graph.max_iterations, 20);
    assert!(graph.description.is_none());
    assert!(graph.declared_start.is_empty());
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.parse_notes.len(), 3);
    assert!(graph.parse_notes[1].starts_with("Ignored malformed graph field 'max_iterations'"));
}

#[test]
fn test_duplicate_node_keeps_first_definition() {
    let text = r#"
graph:
  nodes:
    - { id: A, config: { provider: openai } }
    - { id: A, config: { provider: google } }
  edges: []
"#;
    let graph = parse_workflow(text).unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.node("A").unwrap().provider, "openai");
    assert_eq!(graph.duplicate_nodes, vec!["A".to_string()]);
}

#[test]
fn test_connectivity_linear_flow() {
    let graph = graph(&["START", "A", "B"], &[("START", "A"), ("A", "B")]);
    let connectivity = analyze_connectivity(&graph);

    assert!(connectivity.unreachable_nodes.is_empty());
    assert_eq!(connectivity.end_nodes, vec!["B".to_string()]);
    assert_eq!(connectivity.start_nodes, vec!["START".to_string()]);
    assert!(connectivity.orphan_nodes.is_empty());
}

#[test]
fn test_isolated_node_is_orphan_and_unreachable() {
    let graph = graph(&["START", "A", "B", "C"], &[("START", "A"), ("A", "B")]);
    let connectivity = analyze_connectivity(&graph);

    assert_eq!(connectivity.orphan_nodes, vec!["C".to_string()]);
    assert_eq!(connectivity.unreachable_nodes, vec!["C".to_string()]);
}

#[test]
fn test_start_is_never_unreachable() {
    let graph = graph(&["START", "A"], &[("A", "START")]);
    let connectivity = analyze_connectivity(&graph);
    assert_eq!(connectivity.unreachable_nodes, vec!["A".to_string()]);
}

#[test]
fn test_reachability_seeds_from_start_nodes_without_start() {
    let graph = graph(&["A", "B", "C", "D"], &[("A", "B"), ("C", "D"), ("D", "C")]);
    let connectivity = analyze_connectivity(&graph);

    assert_eq!(connectivity.start_nodes, vec!["A".to_string()]);
    assert_eq!(
        connectivity.unreachable_nodes,
        vec!["C".to_string(), "D".to_string()]
    );
}

#[test]
fn test_missing_reference() {
    let graph = graph(&["START", "A"], &[("START", "A"), ("A", "Z"), ("Y", "A")]);
    let connectivity = analyze_connectivity(&graph);

    assert_eq!(
        connectivity.missing_nodes,
        vec!["Z".to_string(), "Y".to_string()]
    );
    assert_eq!(connectivity.reference_errors.len(), 2);
    assert_eq!(connectivity.reference_errors[0].missing_node_id, "Z");
    assert_eq!(
        connectivity.reference_errors[1].to_string(),
        "Edge Y -> A references undefined source node 'Y'"
    );
    // An edge into an undefined node still counts as outgoing for its source.
    assert!(connectivity.end_nodes.is_empty());
}

#[test]
fn test_two_node_cycle() {
    let graph = graph(
        &["START", "A", "B"],
        &[("START", "A"), ("A", "B"), ("B", "A")],
    );
    let scan = detect_cycles(&graph, 1000);

    assert_eq!(scan.cycles.len(), 1);
    assert_eq!(
        scan.cycles[0],
        vec!["A".to_string(), "B".to_string(), "A".to_string()]
    );
    assert!(!scan.truncated);
}

#[test]
fn test_self_loop_and_nested_cycles() {
    let graph = graph(
        &["A", "B", "C"],
        &[("A", "A"), ("A", "B"), ("B", "C"), ("C", "A"), ("C", "B")],
    );
    let scan = detect_cycles(&graph, 0);

    assert_eq!(
        scan.cycles,
        vec![
            vec!["A".to_string(), "A".to_string()],
            vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "A".to_string()
            ],
            vec!["B".to_string(), "C".to_string(), "B".to_string()],
        ]
    );
}

#[test]
fn test_acyclic_graph_has_no_cycles() {
    let graph = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C"), ("B", "C")]);
    assert!(detect_cycles(&graph, 1000).cycles.is_empty());
}

#[test]
fn test_cycle_enumeration_is_capped() {
    let graph = graph(
        &["A", "B", "C"],
        &[("A", "A"), ("B", "B"), ("C", "C")],
    );
    let scan = detect_cycles(&graph, 2);
    assert_eq!(scan.cycles.len(), 2);
    assert!(scan.truncated);
}

#[test]
fn test_deep_chain_does_not_overflow() {
    let ids: Vec<String> = (0..20_000).map(|i| format!("N{}", i)).collect();
    let mut graph = WorkflowGraph::new();
    for id in &ids {
        graph.add_node(WorkflowNode::new(id.as_str()));
    }
    for pair in ids.windows(2) {
        graph.add_edge(WorkflowEdge::new(pair[0].as_str(), pair[1].as_str()));
    }
    graph.add_edge(WorkflowEdge::new("N19999", "N0"));

    let scan = detect_cycles(&graph, 1000);
    assert_eq!(scan.cycles.len(), 1);
    assert_eq!(scan.cycles[0].len(), 20_001);
}

#[test]
fn test_condition_issues() {
    let text = r#"
graph:
  nodes: [ { id: A }, { id: B }, { id: C }, { id: D } ]
  edges:
    - { from: A, to: B, condition: null }
    - from: B
      to: C
      condition: { type: keyword, config: { any: [] } }
    - { from: C, to: D, condition: true }
    - from: D
      to: A
      condition: { type: expression, config: { expr: "x > 1" } }
"#;
    let graph = parse_workflow(text).unwrap();
    let check = check_conditions(&graph, true);

    assert_eq!(
        check.issues,
        vec![
            "Edge A -> B: Missing condition".to_string(),
            "Edge B -> C: Empty keyword condition".to_string(),
        ]
    );
    assert_eq!(
        check.stats,
        ConditionStats {
            always: 1,
            keyword: 1,
            missing: 1,
            other: 1
        }
    );
}

#[test]
fn test_keyword_prompt_mismatch() {
    let text = r#"
graph:
  nodes:
    - { id: Gate, config: { role: "Decide. Say PASS when done." } }
    - { id: Next }
    - { id: Back }
  edges:
    - from: Gate
      to: Next
      condition: { type: keyword, config: { any: [pass] } }
    - from: Gate
      to: Back
      condition: { type: keyword, config: { any: [RETRY] } }
"#;
    let graph = parse_workflow(text).unwrap();

    let check = check_conditions(&graph, true);
    assert_eq!(
        check.prompt_mismatches,
        vec!["Edge Gate -> Back: keyword 'RETRY' not mentioned in node prompt".to_string()]
    );
    assert!(check_conditions(&graph, false).prompt_mismatches.is_empty());
}

#[test]
fn test_provider_over_reliance() {
    let text = r#"
graph:
  nodes:
    - { id: A, config: { provider: OpenAI, name: gpt-4o } }
    - { id: B, config: { provider: openai, name: gpt-4o } }
    - { id: C, config: { provider: openai, name: o3, tooling: {} } }
    - { id: D, config: { provider: anthropic, name: claude } }
  edges: []
"#;
    let graph = parse_workflow(text).unwrap();
    let distribution = analyze_providers(&graph, 50.0, &[]);

    assert_eq!(distribution.providers[0].provider, "openai");
    assert_eq!(distribution.providers[0].nodes.len(), 3);
    assert_eq!(
        distribution.warnings,
        vec!["Over-reliance on openai (75.0% of nodes)".to_string()]
    );
    assert_eq!(distribution.models.get("gpt-4o"), Some(&2));
    assert_eq!(distribution.tool_enabled_count(), 1);
}

#[test]
fn test_exactly_half_is_not_over_reliance() {
    let text = r#"
graph:
  nodes:
    - { id: A, config: { provider: openai } }
    - { id: B, config: { provider: google } }
  edges: []
"#;
    let graph = parse_workflow(text).unwrap();
    assert!(analyze_providers(&graph, 50.0, &[]).warnings.is_empty());
}

#[test]
fn test_unknown_provider() {
    let text = r#"
graph:
  nodes:
    - { id: START, type: passthrough }
    - { id: A, config: { provider: openai } }
    - { id: B, config: { provider: acme } }
  edges: []
"#;
    let graph = parse_workflow(text).unwrap();
    let known = vec!["openai".to_string(), "google".to_string()];
    let distribution = analyze_providers(&graph, 100.0, &known);
    assert_eq!(
        distribution.warnings,
        vec!["B: Unknown provider 'acme'".to_string()]
    );
}

#[test]
fn test_structure_checks() {
    let text = r#"
graph:
  start: START
  end: [Done, Ghost]
  nodes:
    - { id: START, type: passthrough }
    - { id: Work }
    - { id: Stuck }
    - { id: Done }
  edges:
    - { from: START, to: Work, trigger: true, condition: true }
    - { from: Work, to: Done, trigger: true, condition: true }
    - { from: Work, to: Stuck, condition: true }
"#;
    let graph = parse_workflow(text).unwrap();
    let check = check_structure(&graph, 5);

    assert_eq!(check.undefined_declared, vec!["Ghost".to_string()]);
    assert_eq!(check.dead_end_nodes, vec!["Stuck".to_string()]);
    assert_eq!(check.untriggered_nodes, vec!["Stuck".to_string()]);
    assert!(check.high_in_degree.is_empty());
}

#[test]
fn test_high_in_degree() {
    let sources = ["A", "B", "C"];
    let mut edges: Vec<(&str, &str)> = sources.iter().map(|s| (*s, "Hub")).collect();
    edges.push(("A", "B"));
    let graph = graph(&["A", "B", "C", "Hub"], &edges);

    let check = check_structure(&graph, 2);
    assert_eq!(check.high_in_degree, vec![("Hub".to_string(), 3)]);
    // Without declared end nodes and trigger edges those checks stay quiet.
    assert!(check.dead_end_nodes.is_empty());
    assert!(check.untriggered_nodes.is_empty());
}

#[test]
fn test_missing_required_nodes() {
    let graph = graph(&["START", "A"], &[("START", "A")]);
    let required = vec!["START".to_string(), "Synthesizer".to_string()];
    assert_eq!(
        missing_required_nodes(&graph, &required),
        vec!["Synthesizer".to_string()]
    );
}

#[test]
fn test_custom_format_via_into_workflow() {
    struct Chain(Vec<&'static str>);

    impl IntoWorkflow for Chain {
        fn into_workflow(self) -> std::result::Result<WorkflowGraph, ParseError> {
            let mut graph = WorkflowGraph::new();
            for id in &self.0 {
                graph.add_node(WorkflowNode::new(*id));
            }
            for pair in self.0.windows(2) {
                graph.add_edge(WorkflowEdge::new(pair[0], pair[1]));
            }
            Ok(graph)
        }
    }

    let graph = Chain(vec!["START", "A", "B"]).into_workflow().unwrap();
    assert_eq!(analyze_connectivity(&graph).end_nodes, vec!["B".to_string()]);
}
