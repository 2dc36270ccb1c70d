use crate::config::DiagnosisConfig;
use crate::convergence::{ConvergenceSummary, ConvergenceVerdict, convergence_trend};
use crate::error::{ConfigError, ParseError};
use crate::signals::SignalExtractor;
use crate::trace::{ExecutionAudit, ExecutionTrace, IterationTimeline, LoopPattern, detect_loops};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Problem,
    Ok,
}

/// One finding of the diagnosis with follow-up hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisStatement {
    pub kind: StatementKind,
    pub summary: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

impl DiagnosisStatement {
    pub fn problem(summary: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Problem,
            summary: summary.into(),
            hints: Vec::new(),
        }
    }

    pub fn ok(summary: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Ok,
            summary: summary.into(),
            hints: Vec::new(),
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_problem(&self) -> bool {
        self.kind == StatementKind::Problem
    }
}

impl fmt::Display for DiagnosisStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            StatementKind::Problem => "PROBLEM",
            StatementKind::Ok => "OK",
        };
        write!(f, "{}: {}", label, self.summary)?;
        for hint in &self.hints {
            write!(f, "\n  -> {}", hint)?;
        }
        Ok(())
    }
}

/// Conclusions drawn from one execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub statements: Vec<DiagnosisStatement>,
    /// `None` when no terminal node is configured.
    #[serde(alias = "synthesizer_reached")]
    pub terminal_reached: Option<bool>,
    /// Half-split trend of the configured convergence metric.
    pub convergence_verdict: ConvergenceVerdict,
    #[serde(default)]
    pub convergence: Option<ConvergenceSummary>,
}

impl Diagnosis {
    /// The diagnosis of a trace that could not be read at all.
    pub fn parse_failure(error: &ParseError) -> Self {
        Self {
            statements: vec![
                DiagnosisStatement::problem(format!("Could not parse execution trace: {}", error))
                    .hint("Check that the trace is a JSON object with an execution_log"),
            ],
            terminal_reached: None,
            convergence_verdict: ConvergenceVerdict::Insufficient,
            convergence: None,
        }
    }

    pub fn problems(&self) -> impl Iterator<Item = &DiagnosisStatement> {
        self.statements.iter().filter(|s| s.is_problem())
    }

    pub fn has_problems(&self) -> bool {
        self.problems().next().is_some()
    }

    /// Whether any statement summary contains `text`, ignoring ASCII case.
    pub fn mentions(&self, text: &str) -> bool {
        let needle = text.to_ascii_lowercase();
        self.statements
            .iter()
            .any(|s| s.summary.to_ascii_lowercase().contains(&needle))
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return write!(f, "No problems detected.");
        }
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

/// Applies the diagnosis rules to an execution trace.
///
/// Rules are independent and evaluated in a fixed order:
///
/// 1. the configured terminal node never produced output;
/// 2. both nodes of the configured feedback pair ran more often than the
///    execution threshold;
/// 3. the half-split trend of the convergence metric;
/// 4. exact repeats of per-iteration node sequences;
/// 5. the run stopped at the iteration cap;
/// 6. routing nodes produced outputs without any known marker.
///
/// Diagnosis never fails: missing vocabulary only means the matching rule is
/// skipped.
#[derive(Debug, Clone)]
pub struct DiagnosisEngine {
    config: DiagnosisConfig,
    signals: SignalExtractor,
}

impl DiagnosisEngine {
    pub fn new(config: DiagnosisConfig) -> Result<Self, ConfigError> {
        let signals = SignalExtractor::new(&config)?;
        Ok(Self { config, signals })
    }

    pub fn config(&self) -> &DiagnosisConfig {
        &self.config
    }

    pub fn signals(&self) -> &SignalExtractor {
        &self.signals
    }

    /// Values of the configured convergence metric, oldest first.
    pub fn convergence_series(&self, trace: &ExecutionTrace) -> Vec<f64> {
        match &self.config.convergence {
            Some(target) => self
                .signals
                .metric_series(trace, &target.node, &target.metric),
            None => Vec::new(),
        }
    }

    /// Diagnoses a trace, deriving loop patterns and execution health on the way.
    pub fn diagnose(&self, trace: &ExecutionTrace) -> Diagnosis {
        let timeline = IterationTimeline::from_trace(trace);
        let loops = detect_loops(&timeline);
        let execution = ExecutionAudit::from_trace(
            trace,
            self.config.verification.as_ref(),
            self.config.max_iterations,
        );
        self.diagnose_with(trace, &loops, &execution)
    }

    /// Diagnoses a trace from loop patterns and execution health computed by the caller.
    pub fn diagnose_with(
        &self,
        trace: &ExecutionTrace,
        loops: &[LoopPattern],
        execution: &ExecutionAudit,
    ) -> Diagnosis {
        let mut statements = Vec::new();

        let terminal_reached = self.config.terminal_node.as_ref().map(|t| trace.reached(t));
        if let (Some(terminal), Some(false)) = (&self.config.terminal_node, terminal_reached) {
            let mut statement =
                DiagnosisStatement::problem(format!("Terminal stage never reached: {}", terminal));
            for hint in self.unemitted_exit_markers(trace, terminal) {
                statement = statement.hint(hint);
            }
            statements.push(statement);
        }

        if let Some(pair) = &self.config.feedback_pair {
            let threshold = self.config.execution_threshold;
            if trace.execution_count(&pair.first) > threshold
                && trace.execution_count(&pair.second) > threshold
            {
                statements.push(
                    DiagnosisStatement::problem(format!(
                        "Feedback loop between {} and {} - check exit criteria",
                        pair.first, pair.second
                    ))
                    .hint(format!("{} keeps routing to {}", pair.first, pair.second))
                    .hint(format!("Check if {} has clear exit criteria", pair.first)),
                );
            }
        }

        let series = self.convergence_series(trace);
        let convergence_verdict = convergence_trend(&series);
        match convergence_verdict {
            ConvergenceVerdict::NotConverging => statements.push(
                DiagnosisStatement::problem("Iterations are NOT improving convergence")
                    .hint("Variance not decreasing: loop is UNPRODUCTIVE"),
            ),
            ConvergenceVerdict::Converging => statements.push(DiagnosisStatement::ok(
                "Variance is decreasing, iterations may be productive",
            )),
            _ => {}
        }
        let convergence = ConvergenceSummary::from_values(
            &series,
            self.config.converging_spread,
            self.config.moderate_spread,
        );

        if let Some(first) = loops.first() {
            statements.push(
                DiagnosisStatement::problem(format!(
                    "Detected {} repeating execution patterns",
                    loops.len()
                ))
                .hint(format!(
                    "Pattern from iteration {} repeated at iteration {}",
                    first.first_iteration, first.repeated_iteration
                ))
                .hint("The workflow appears to be stuck in a loop"),
            );
        }

        if execution.hit_iteration_cap {
            statements.push(
                DiagnosisStatement::problem(format!(
                    "Hit max iterations ({}) - possible infinite loop",
                    trace.iterations
                ))
                .hint("The run was stopped by the iteration cap, not by an exit decision"),
            );
        }

        for rule in &self.config.routing_rules {
            if rule.markers.is_empty() {
                continue;
            }
            let progression = self.signals.progression(trace, &rule.node);
            let undecided = progression.iter().filter(|e| e.decision.is_none()).count();
            if undecided > 0 {
                let markers = rule.markers.iter().map(|m| m.marker.as_str());
                statements.push(
                    DiagnosisStatement::problem(format!(
                        "{}: {} of {} executions had no recognizable routing marker",
                        rule.node,
                        undecided,
                        progression.len()
                    ))
                    .hint(format!(
                        "Check that {} emits one of: {}",
                        rule.node,
                        itertools::join(markers, ", ")
                    )),
                );
            }
        }

        debug!(
            statements = statements.len(),
            verdict = ?convergence_verdict,
            "diagnosis complete"
        );
        Diagnosis {
            statements,
            terminal_reached,
            convergence_verdict,
            convergence,
        }
    }

    /// Routing markers that lead to the terminal node but never appeared in their node's output.
    fn unemitted_exit_markers(&self, trace: &ExecutionTrace, terminal: &str) -> Vec<String> {
        let mut hints = Vec::new();
        for rule in &self.config.routing_rules {
            for marker in rule.markers.iter().filter(|m| m.marker.contains(terminal)) {
                let emitted = trace
                    .outputs(&rule.node)
                    .iter()
                    .any(|o| o.content.contains(marker.marker.as_str()));
                if !emitted {
                    hints.push(format!("{} never output '{}'", rule.node, marker.marker));
                }
            }
        }
        hints
    }
}
