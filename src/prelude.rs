//! Prelude module for convenient imports
//!
//! Re-exports the types needed for the common audit and diagnosis flows.
//!
//! # Example
//!
//! ```rust,no_run
//! use kansa::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = KansaConfig::from_file("demos/equity_research.yaml")?;
//!
//! let auditor = Auditor::new(config.audit.clone());
//! let report = auditor.audit_file("demos/workflow.yaml")?;
//! println!("{}", report);
//!
//! let analyzer = IterationAnalyzer::new(config.diagnosis)?;
//! let analysis = analyzer.analyze_file("demos/trace.json")?;
//! println!("{}", analysis.diagnosis);
//! # Ok(())
//! # }
//! ```

// Static audit
pub use crate::analysis::GraphAnalyzer;
pub use crate::audit::{AuditHistory, AuditReport, Auditor};
pub use crate::workflow::{
    Condition, DocumentFormat, IntoWorkflow, WorkflowEdge, WorkflowGraph, WorkflowNode,
    load_workflow, parse_workflow,
};

// Dynamic diagnosis
pub use crate::convergence::ConvergenceVerdict;
pub use crate::diagnosis::{Diagnosis, DiagnosisEngine};
pub use crate::iterations::{IterationAnalysis, IterationAnalyzer};
pub use crate::trace::ExecutionTrace;

// Configuration
pub use crate::config::{AuditConfig, DiagnosisConfig, KansaConfig, RoutingRule};

// Error types
pub use crate::error::{KansaError, ParseError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
