use crate::analysis::{GraphAnalyzer, default_analyzers, list};
use crate::config::AuditConfig;
use crate::error::{KansaError, MissingDataError, read_document};
use crate::workflow::{DocumentFormat, IntoWorkflow, WorkflowDocument, WorkflowGraph};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};

mod history;
mod report;

pub use history::AuditHistory;
pub use report::AuditReport;

/// Runs the registered analyzers over workflow graphs and collects their findings.
///
/// An `Auditor` holds no per-audit state, so one instance can audit any number
/// of workflows, concurrently if needed.
pub struct Auditor {
    config: AuditConfig,
    analyzers: Vec<Box<dyn GraphAnalyzer>>,
}

pub struct AuditorBuilder {
    config: AuditConfig,
    analyzers: Vec<Box<dyn GraphAnalyzer>>,
}

impl AuditorBuilder {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            analyzers: default_analyzers(),
        }
    }

    /// Appends an analyzer. It runs after the ones already registered.
    pub fn with_analyzer(mut self, analyzer: Box<dyn GraphAnalyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    /// Removes every registered analyzer with the given name.
    pub fn without_analyzer(mut self, name: &str) -> Self {
        self.analyzers.retain(|a| a.name() != name);
        self
    }

    pub fn build(self) -> Auditor {
        Auditor {
            config: self.config,
            analyzers: self.analyzers,
        }
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}

impl Auditor {
    pub fn new(config: AuditConfig) -> Self {
        AuditorBuilder::new(config).build()
    }

    pub fn builder(config: AuditConfig) -> AuditorBuilder {
        AuditorBuilder::new(config)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Names of the registered analyzers, in run order.
    pub fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Audits an already normalized graph.
    pub fn audit(&self, name: &str, graph: &WorkflowGraph) -> AuditReport {
        let _span = info_span!("audit", workflow = name).entered();
        let mut report = AuditReport::new(name);
        report.workflow_id = graph.id.clone();
        report.node_count = graph.node_count();
        report.edge_count = graph.edge_count();
        report.warnings.extend(graph.parse_notes.iter().cloned());
        if !graph.duplicate_nodes.is_empty() {
            report.critical_issues.push(format!(
                "Duplicate node definitions: {}",
                list(&graph.duplicate_nodes)
            ));
        }

        for analyzer in &self.analyzers {
            debug!(analyzer = analyzer.name(), "running analyzer");
            if let Err(error) = analyzer.apply(graph, &self.config, &mut report) {
                warn!(analyzer = analyzer.name(), %error, "analyzer failed");
                report.critical_issues.push(error.to_string());
            }
        }

        self.recommend(&mut report);
        report.is_valid = report.critical_issues.is_empty();
        info!(
            valid = report.is_valid,
            critical = report.critical_issues.len(),
            warnings = report.warnings.len(),
            "audit finished"
        );
        report
    }

    /// Parses and audits workflow text.
    ///
    /// Text that cannot be parsed still yields a report: an invalid one whose
    /// only finding is the parse failure.
    pub fn audit_str(&self, name: &str, text: &str, format: DocumentFormat) -> AuditReport {
        let parsed = WorkflowDocument::parse_as(text, format).and_then(IntoWorkflow::into_workflow);
        match parsed {
            Ok(graph) => self.audit(name, &graph),
            Err(error) => {
                warn!(workflow = name, %error, "workflow could not be parsed");
                let mut report = AuditReport::new(name);
                report
                    .critical_issues
                    .push(format!("Could not parse workflow: {}", error));
                report.is_valid = false;
                report
            }
        }
    }

    /// Reads and audits a workflow file. Only an unreadable file is an error.
    pub fn audit_file(&self, path: impl AsRef<Path>) -> Result<AuditReport, MissingDataError> {
        let path = path.as_ref();
        let text = read_document(path)?;
        Ok(self.audit_str(
            &path.display().to_string(),
            &text,
            DocumentFormat::from_path(path),
        ))
    }

    /// Audits several files in parallel. Results keep the order of `paths`.
    pub fn audit_files(&self, paths: &[PathBuf]) -> Vec<Result<AuditReport, KansaError>> {
        paths
            .par_iter()
            .map(|path| self.audit_file(path).map_err(KansaError::from))
            .collect()
    }

    /// Audits a graph and appends the report to a caller-owned history.
    ///
    /// The history is taken and handed back by value, so no state survives
    /// between calls unless the caller keeps it.
    pub fn audit_recorded(
        &self,
        name: &str,
        graph: &WorkflowGraph,
        mut history: AuditHistory,
    ) -> (AuditReport, AuditHistory) {
        let report = self.audit(name, graph);
        history.record(report.clone());
        (report, history)
    }

    fn recommend(&self, report: &mut AuditReport) {
        let over_limit = report.providers_used.values().any(|&count| {
            report.node_count > 0
                && count as f64 / report.node_count as f64 * 100.0 > self.config.provider_share_limit
        });
        if over_limit {
            report.recommendations.push(
                "Consider diversifying AI providers to reduce single-point-of-failure risk"
                    .to_string(),
            );
        }
        if report.cycles.is_empty() && report.node_count > 0 {
            report.recommendations.push(
                "No feedback loops detected - consider adding quality gate loop-backs".to_string(),
            );
        }
    }
}
