//! Structural analyzers run by the [`Auditor`](crate::audit::Auditor).
//!
//! Each analyzer is usable on its own through its free function
//! (`analyze_connectivity`, `detect_cycles`, ...) and also implements
//! [`GraphAnalyzer`] so the auditor can run it as one stage of a report.

use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::AnalysisError;
use crate::workflow::WorkflowGraph;

pub mod conditions;
pub mod connectivity;
pub mod cycles;
pub mod providers;
pub mod required;
pub mod structure;

pub use conditions::{ConditionCheck, ConditionStats, ConditionValidator, check_conditions};
pub use connectivity::{Connectivity, ConnectivityAnalyzer, analyze_connectivity};
pub use cycles::{CycleDetector, CycleScan, detect_cycles};
pub use providers::{
    ProviderDistribution, ProviderDistributionAnalyzer, ProviderShare, analyze_providers,
};
pub use required::{RequiredNodesCheck, missing_required_nodes};
pub use structure::{StructureAnalyzer, StructureCheck, check_structure};

/// Defines the contract for one stage of a structural audit.
///
/// An analyzer reads the graph and writes its findings into the report. Returning
/// an error does not stop the audit: the auditor records it as a critical issue
/// and moves on to the next analyzer.
pub trait GraphAnalyzer: Send + Sync {
    fn name(&self) -> &str;
    fn apply(
        &self,
        graph: &WorkflowGraph,
        config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError>;
}

/// The standard analyzers, in the order their findings appear in a report.
pub fn default_analyzers() -> Vec<Box<dyn GraphAnalyzer>> {
    vec![
        Box::new(ConnectivityAnalyzer),
        Box::new(CycleDetector),
        Box::new(ProviderDistributionAnalyzer),
        Box::new(ConditionValidator),
        Box::new(StructureAnalyzer),
        Box::new(RequiredNodesCheck),
    ]
}

/// Joins node ids for issue messages.
pub(crate) fn list(items: &[String]) -> String {
    itertools::join(items, ", ")
}
