//! Tests for the auditor: report composition, failure isolation and history.
mod common;
use common::*;
use kansa::analysis::GraphAnalyzer;
use kansa::error::AnalysisError;
use kansa::prelude::*;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::PathBuf;

#[test]
fn test_audit_review_workflow_is_valid() {
    let auditor = Auditor::default();
    let report = auditor.audit_str("review.yaml", REVIEW_WORKFLOW, DocumentFormat::Yaml);

    assert!(report.is_valid, "unexpected issues: {:?}", report.critical_issues);
    assert_eq!(report.workflow_id.as_deref(), Some("review_flow"));
    assert_eq!(report.node_count, 4);
    assert_eq!(report.edge_count, 4);
    assert_eq!(report.start_nodes, vec!["START".to_string()]);
    assert_eq!(report.end_nodes, vec!["Publish".to_string()]);
    assert_eq!(
        report.cycles,
        vec![vec![
            "Draft".to_string(),
            "Review".to_string(),
            "Draft".to_string()
        ]]
    );
    assert_eq!(report.tool_enabled_count, 1);
    assert_eq!(report.condition_stats.always, 2);
    assert_eq!(report.condition_stats.keyword, 2);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("may be intentional for feedback loops"))
    );
    assert!(
        !report
            .recommendations
            .iter()
            .any(|r| r.contains("quality gate loop-backs"))
    );
}

#[test]
fn test_unreachable_and_missing_are_critical() {
    let graph = graph(
        &["START", "A", "Lonely"],
        &[("START", "A"), ("A", "Ghost")],
    );
    let report = Auditor::default().audit("broken", &graph);

    assert!(!report.is_valid);
    assert_eq!(report.orphan_nodes, vec!["Lonely".to_string()]);
    assert_eq!(report.unreachable_nodes, vec!["Lonely".to_string()]);
    assert_eq!(report.missing_nodes, vec!["Ghost".to_string()]);
    assert!(
        report
            .critical_issues
            .contains(&"Unreachable nodes: Lonely".to_string())
    );
    assert!(
        report
            .critical_issues
            .contains(&"Missing node definitions: Ghost".to_string())
    );
    assert!(
        report
            .warnings
            .contains(&"Orphan nodes found: Lonely".to_string())
    );
    assert!(
        report
            .recommendations
            .contains(&"Fix 1 edges referencing non-existent nodes".to_string())
    );
}

#[test]
fn test_mistyped_graph_field_keeps_partial_results() {
    let text = r#"
graph:
  max_iterations: twenty
  nodes:
    - id: START
    - id: A
  edges:
    - { from: START, to: A }
    - { from: A, to: Z }
"#;
    let report = Auditor::default().audit_str("partial", text, DocumentFormat::Yaml);

    assert_eq!(report.missing_nodes, vec!["Z".to_string()]);
    assert!(
        report
            .critical_issues
            .contains(&"Missing node definitions: Z".to_string())
    );
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.starts_with("Ignored malformed graph field 'max_iterations'"))
    );
    assert!(report.critical_issues.iter().all(|c| !c.starts_with("Could not parse")));
}

#[test]
fn test_acyclic_workflow_recommends_loop_backs() {
    let graph = graph(&["START", "A"], &[("START", "A")]);
    let report = Auditor::default().audit("linear", &graph);

    assert!(report.is_valid);
    assert!(report.cycles.is_empty());
    assert!(report.recommendations.contains(
        &"No feedback loops detected - consider adding quality gate loop-backs".to_string()
    ));
}

#[test]
fn test_single_provider_recommends_diversification() {
    let graph = graph(&["START", "A"], &[("START", "A")]);
    let report = Auditor::default().audit("single", &graph);

    // Both nodes default to the "unknown" provider.
    assert_eq!(report.providers_used.get("unknown"), Some(&2));
    assert!(report.warnings.contains(&"Over-reliance on unknown (100.0% of nodes)".to_string()));
    assert!(report.recommendations.contains(
        &"Consider diversifying AI providers to reduce single-point-of-failure risk".to_string()
    ));
}

#[test]
fn test_required_nodes() {
    let config = AuditConfig::default().with_required_nodes(["START", "Synthesizer"]);
    let report = Auditor::new(config).audit_str("review", REVIEW_WORKFLOW, DocumentFormat::Yaml);

    assert!(!report.is_valid);
    assert_eq!(
        report.critical_issues,
        vec!["Missing required node: Synthesizer".to_string()]
    );
}

#[test]
fn test_duplicate_nodes_are_critical() {
    let text = "graph:\n  nodes: [ { id: A }, { id: A } ]\n  edges: []\n";
    let report = Auditor::default().audit_str("dup", text, DocumentFormat::Yaml);
    assert!(!report.is_valid);
    assert!(
        report
            .critical_issues
            .contains(&"Duplicate node definitions: A".to_string())
    );
}

#[test]
fn test_parse_failure_yields_single_critical_issue() {
    let report = Auditor::default().audit_str("bad", "graph: {nodes: [", DocumentFormat::Yaml);

    assert!(!report.is_valid);
    assert_eq!(report.critical_issues.len(), 1);
    assert!(report.critical_issues[0].starts_with("Could not parse workflow:"));
    assert_eq!(report.node_count, 0);
}

struct FailingAnalyzer;

impl GraphAnalyzer for FailingAnalyzer {
    fn name(&self) -> &str {
        "failing"
    }

    fn apply(
        &self,
        _graph: &WorkflowGraph,
        _config: &AuditConfig,
        _report: &mut AuditReport,
    ) -> std::result::Result<(), AnalysisError> {
        Err(AnalysisError::new("failing", "boom"))
    }
}

struct NodeCounter;

impl GraphAnalyzer for NodeCounter {
    fn name(&self) -> &str {
        "node-counter"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        _config: &AuditConfig,
        report: &mut AuditReport,
    ) -> std::result::Result<(), AnalysisError> {
        report
            .warnings
            .push(format!("counted {} nodes", graph.node_count()));
        Ok(())
    }
}

#[test]
fn test_analyzer_failure_is_isolated() {
    let auditor = Auditor::builder(AuditConfig::default())
        .with_analyzer(Box::new(FailingAnalyzer))
        .with_analyzer(Box::new(NodeCounter))
        .build();
    let report = auditor.audit_str("review", REVIEW_WORKFLOW, DocumentFormat::Yaml);

    assert!(!report.is_valid);
    assert_eq!(
        report.critical_issues,
        vec!["Analyzer 'failing' failed: boom".to_string()]
    );
    assert!(report.warnings.contains(&"counted 4 nodes".to_string()));
    // Built-in analyzers still ran.
    assert_eq!(report.cycles.len(), 1);
}

#[test]
fn test_builder_can_remove_analyzers() {
    let auditor = Auditor::builder(AuditConfig::default())
        .without_analyzer("cycles")
        .build();
    assert!(!auditor.analyzer_names().contains(&"cycles"));

    let report = auditor.audit_str("review", REVIEW_WORKFLOW, DocumentFormat::Yaml);
    assert!(report.cycles.is_empty());
}

#[test]
fn test_report_json_round_trip() {
    let graph = graph(
        &["START", "A", "B", "Lonely"],
        &[("START", "A"), ("A", "B"), ("B", "A"), ("B", "Ghost")],
    );
    let report = Auditor::default().audit("round-trip", &graph);
    assert!(!report.is_valid);

    let json = report.to_json().unwrap();
    let restored = AuditReport::from_json(&json).unwrap();

    assert_eq!(restored, report);
    assert_eq!(restored.cycles, report.cycles);
    assert_eq!(restored.critical_issues, report.critical_issues);
    assert_eq!(restored.warnings, report.warnings);
}

#[test]
fn test_report_text_rendering() {
    let report = Auditor::default().audit_str("review.yaml", REVIEW_WORKFLOW, DocumentFormat::Yaml);
    let text = report.to_string();

    assert!(text.contains("WORKFLOW AUDIT: review.yaml"));
    assert!(text.contains("Status: VALID"));
    assert!(text.contains("Draft -> Review -> Draft"));
    assert!(text.contains("WARNINGS"));
}

#[test]
fn test_audit_files_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_path = dir.path().join("review.yaml");
    let json_path = dir.path().join("review.json");
    std::fs::write(&yaml_path, REVIEW_WORKFLOW).unwrap();
    let mut json_file = std::fs::File::create(&json_path).unwrap();
    json_file.write_all(review_workflow_json().as_bytes()).unwrap();
    let missing_path = dir.path().join("missing.yaml");

    let paths: Vec<PathBuf> = vec![yaml_path, json_path, missing_path];
    let results = Auditor::default().audit_files(&paths);

    assert_eq!(results.len(), 3);
    let yaml_report = results[0].as_ref().unwrap();
    let json_report = results[1].as_ref().unwrap();
    assert_eq!(yaml_report.cycles, json_report.cycles);
    assert_eq!(yaml_report.warnings, json_report.warnings);
    assert!(matches!(results[2], Err(KansaError::MissingData(_))));
}

#[test]
fn test_history_is_caller_owned() {
    let auditor = Auditor::default();
    let healthy = graph(&["START", "A"], &[("START", "A")]);
    let broken = graph(&["START", "A", "B"], &[("START", "A")]);

    let history = AuditHistory::new();
    let (first, history) = auditor.audit_recorded("flow", &healthy, history);
    assert!(first.is_valid);
    assert_eq!(history.len(), 1);

    let new_issues = {
        let report = auditor.audit("flow", &broken);
        history.new_critical_issues(&report)
    };
    assert_eq!(new_issues, vec!["Unreachable nodes: B".to_string()]);

    let (second, history) = auditor.audit_recorded("flow", &broken, history);
    assert_eq!(history.len(), 2);
    assert_eq!(history.latest("flow"), Some(&second));
    assert!(history.latest("other").is_none());

    // A separate history starts empty: audits share no state.
    assert!(AuditHistory::new().is_empty());
}
