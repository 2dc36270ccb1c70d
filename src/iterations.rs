use crate::config::DiagnosisConfig;
use crate::convergence::ConvergenceSummary;
use crate::diagnosis::{Diagnosis, DiagnosisEngine};
use crate::error::{ConfigError, KansaError, MissingDataError, read_document};
use crate::signals::NodeExecution;
use crate::trace::{
    ExecutionAudit, ExecutionTrace, IterationTimeline, LoopPattern, ReportFormatter, detect_loops,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// How often a watched node ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCount {
    pub node: String,
    pub executions: usize,
    pub excessive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProgression {
    pub node: String,
    pub executions: Vec<NodeExecution>,
}

/// Everything learned from one execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationAnalysis {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub ticker: String,
    pub iterations: u32,
    pub verified_price: Option<f64>,
    pub timeline: IterationTimeline,
    pub loops: Vec<LoopPattern>,
    pub execution_counts: Vec<NodeCount>,
    pub progressions: Vec<NodeProgression>,
    pub convergence: Option<ConvergenceSummary>,
    pub execution: ExecutionAudit,
    pub diagnosis: Diagnosis,
}

impl IterationAnalysis {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the whole dynamic path over execution traces.
#[derive(Debug, Clone)]
pub struct IterationAnalyzer {
    engine: DiagnosisEngine,
}

impl IterationAnalyzer {
    pub fn new(config: DiagnosisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: DiagnosisEngine::new(config)?,
        })
    }

    pub fn config(&self) -> &DiagnosisConfig {
        self.engine.config()
    }

    pub fn analyze(&self, source: &str, trace: &ExecutionTrace) -> IterationAnalysis {
        let _span = info_span!("analyze_iterations", source).entered();
        let config = self.engine.config();

        let timeline = IterationTimeline::from_trace(trace);
        let loops = detect_loops(&timeline);
        let execution =
            ExecutionAudit::from_trace(trace, config.verification.as_ref(), config.max_iterations);
        let diagnosis = self.engine.diagnose_with(trace, &loops, &execution);

        let watched = config.watched_nodes();
        let execution_counts = watched
            .iter()
            .map(|node| {
                let executions = trace.execution_count(node);
                NodeCount {
                    node: node.clone(),
                    executions,
                    excessive: executions > config.execution_threshold,
                }
            })
            .collect();
        let progressions = watched
            .iter()
            .filter(|node| trace.reached(node))
            .map(|node| NodeProgression {
                node: node.clone(),
                executions: self.engine.signals().progression(trace, node),
            })
            .collect();

        info!(
            groups = timeline.len(),
            loops = loops.len(),
            problems = diagnosis.problems().count(),
            "iteration analysis finished"
        );
        IterationAnalysis {
            source: source.to_string(),
            generated_at: Utc::now(),
            ticker: trace.ticker.clone(),
            iterations: trace.iterations,
            verified_price: trace.verified_price,
            timeline,
            loops,
            execution_counts,
            progressions,
            convergence: diagnosis.convergence.clone(),
            execution,
            diagnosis,
        }
    }

    /// Analyzes trace text. Malformed text yields an analysis whose diagnosis
    /// reports the parse failure.
    pub fn analyze_str(&self, source: &str, text: &str) -> IterationAnalysis {
        match ExecutionTrace::from_json(text) {
            Ok(trace) => self.analyze(source, &trace),
            Err(error) => {
                warn!(source, %error, "execution trace could not be parsed");
                let mut analysis = self.analyze(source, &ExecutionTrace::default());
                analysis.diagnosis = Diagnosis::parse_failure(&error);
                analysis.convergence = None;
                analysis
            }
        }
    }

    pub fn analyze_file(&self, path: impl AsRef<Path>) -> Result<IterationAnalysis, MissingDataError> {
        let path = path.as_ref();
        let text = read_document(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.analyze_str(&source, &text))
    }

    pub fn render(&self, analysis: &IterationAnalysis) -> String {
        ReportFormatter::format_iteration_report(analysis, self.engine.config())
    }

    /// Renders the text report and writes it next to the trace file.
    pub fn write_report(
        &self,
        analysis: &IterationAnalysis,
        trace_path: &Path,
    ) -> Result<PathBuf, KansaError> {
        let path = report_path(trace_path);
        std::fs::write(&path, self.render(analysis)).map_err(|source| KansaError::Write {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "iteration report written");
        Ok(path)
    }
}

/// `<dir>/<stem>_iteration_analysis.txt` for a trace at `<dir>/<stem>.<ext>`.
pub fn report_path(trace_path: &Path) -> PathBuf {
    let stem = trace_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    trace_path.with_file_name(format!("{}_iteration_analysis.txt", stem))
}
