//! # Kansa - Workflow Graph Auditor and Iteration Diagnostician
//!
//! **Kansa** inspects multi-stage workflows that route work between processing
//! nodes, including deliberate feedback edges for iterative refinement. It works
//! on two independent inputs:
//!
//! 1.  **Workflow definitions** (YAML or JSON). The [`Auditor`](audit::Auditor)
//!     runs a registry of structural analyzers (reachability, cycles, edge
//!     conditions, provider distribution, structural hygiene, required nodes)
//!     and returns an [`AuditReport`](audit::AuditReport).
//! 2.  **Execution traces** (JSON) recorded from a run. The
//!     [`IterationAnalyzer`](iterations::IterationAnalyzer) rebuilds the
//!     per-iteration timeline, finds repeating loops, reads routing markers and
//!     quality metrics from node outputs, measures convergence and produces a
//!     [`Diagnosis`](diagnosis::Diagnosis) plus a text report.
//!
//! Workflow vocabulary (required nodes, routing markers, the feedback pair,
//! the terminal stage and the convergence metric) is configuration, see
//! [`config`].
//!
//! ## Quick Start
//!
//! ```rust
//! use kansa::prelude::*;
//!
//! let workflow = r#"
//! graph:
//!   id: review
//!   nodes:
//!     - id: START
//!     - id: Draft
//!       config: { provider: openai, name: gpt-4o }
//!     - id: Review
//!       config: { provider: anthropic, name: claude }
//!   edges:
//!     - { from: START, to: Draft, condition: true }
//!     - { from: Draft, to: Review, condition: true }
//!     - from: Review
//!       to: Draft
//!       condition: { type: keyword, config: { any: ["REVISE"] } }
//! "#;
//!
//! let auditor = Auditor::new(AuditConfig::default());
//! let report = auditor.audit_str("review.yaml", workflow, DocumentFormat::Yaml);
//! assert!(report.is_valid);
//! assert_eq!(report.cycles.len(), 1);
//!
//! let trace = ExecutionTrace::from_json(r#"{"ticker": "DEMO", "node_outputs": {}}"#)?;
//! let engine = DiagnosisEngine::new(DiagnosisConfig::default().with_terminal_node("Review"))?;
//! let diagnosis = engine.diagnose(&trace);
//! assert_eq!(diagnosis.terminal_reached, Some(false));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod audit;
pub mod config;
pub mod convergence;
pub mod diagnosis;
pub mod error;
pub mod iterations;
pub mod prelude;
pub mod signals;
pub mod trace;
pub mod workflow;
