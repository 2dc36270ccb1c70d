use crate::config::DiagnosisConfig;
use crate::convergence::ConvergenceVerdict;
use crate::iterations::{IterationAnalysis, NodeProgression};
use crate::signals::{QualityMetricSample, truncate_chars};

const WIDTH: usize = 80;
const SNIPPET_DISPLAY: usize = 150;
const LOOPS_SHOWN: usize = 10;
const LOOP_NODES_SHOWN: usize = 5;

/// Renders iteration analyses as plain-text reports.
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn format_iteration_report(analysis: &IterationAnalysis, config: &DiagnosisConfig) -> String {
        let mut out = String::new();
        Self::header(&mut out, analysis);
        Self::summary(&mut out, analysis);
        Self::execution_counts(&mut out, analysis);
        for progression in &analysis.progressions {
            Self::progression(&mut out, progression, config);
        }
        Self::convergence(&mut out, analysis, config);
        Self::loops(&mut out, analysis);
        Self::execution_health(&mut out, analysis);

        Self::banner(&mut out, "DIAGNOSIS");
        for statement in &analysis.diagnosis.statements {
            out.push_str(&format!("{}\n", statement));
        }
        if analysis.diagnosis.statements.is_empty() {
            out.push_str("No problems detected.\n");
        }
        out.push('\n');
        Self::banner(&mut out, "END OF REPORT");
        out
    }

    fn banner(out: &mut String, title: &str) {
        let rule = "=".repeat(WIDTH);
        out.push_str(&format!("{}\n{}\n{}\n", rule, title, rule));
    }

    fn section(out: &mut String, title: &str) {
        let rule = "-".repeat(WIDTH);
        out.push_str(&format!("{}\n{}\n{}\n", rule, title, rule));
    }

    fn header(out: &mut String, analysis: &IterationAnalysis) {
        Self::banner(out, &format!("ITERATION ANALYSIS REPORT: {}", analysis.ticker));
        out.push_str(&format!("Generated: {}\n", analysis.generated_at.to_rfc3339()));
        out.push_str(&format!("Source: {}\n", analysis.source));
        out.push_str(&format!("Total Iterations: {}\n", analysis.iterations));
        match analysis.verified_price {
            Some(price) => out.push_str(&format!("Verified Price: {}\n", price)),
            None => out.push_str("Verified Price: none\n"),
        }
        out.push('\n');
    }

    fn summary(out: &mut String, analysis: &IterationAnalysis) {
        Self::section(out, "EXECUTIVE SUMMARY");
        if analysis.loops.is_empty() {
            out.push_str("No obvious repeating patterns detected.\n");
        } else {
            out.push_str(&format!(
                "WARNING: Detected {} repeating patterns!\n",
                analysis.loops.len()
            ));
            out.push_str("The workflow appears to be stuck in a loop.\n");
        }
        let problems = analysis.diagnosis.problems().count();
        out.push_str(&format!("Problems diagnosed: {}\n", problems));
        out.push('\n');
    }

    fn execution_counts(out: &mut String, analysis: &IterationAnalysis) {
        if analysis.execution_counts.is_empty() {
            return;
        }
        Self::section(out, "NODE EXECUTION COUNTS");
        for count in &analysis.execution_counts {
            let status = if count.excessive { "EXCESSIVE" } else { "NORMAL" };
            out.push_str(&format!(
                "  {:25} : {:3} executions  [{}]\n",
                count.node, count.executions, status
            ));
        }
        out.push('\n');
    }

    fn progression(out: &mut String, progression: &NodeProgression, config: &DiagnosisConfig) {
        Self::banner(out, &format!("{} PROGRESSION", progression.node.to_uppercase()));
        let has_rule = config
            .routing_rules
            .iter()
            .any(|r| r.node == progression.node && !r.markers.is_empty());

        let mut previous: Option<&QualityMetricSample> = None;
        for execution in &progression.executions {
            out.push_str(&format!("--- Execution #{} ---\n", execution.execution));
            if has_rule {
                match &execution.decision {
                    Some(key) => {
                        let marker = execution
                            .markers
                            .iter()
                            .find(|m| &m.key == key)
                            .map(|m| m.marker.as_str())
                            .unwrap_or_default();
                        out.push_str(&format!("  DECISION: {} ({})\n", key, marker));
                    }
                    None => out.push_str("  DECISION: NO CLEAR ROUTING MARKER FOUND!\n"),
                }
            }

            let metrics = &execution.metrics;
            if !metrics.values.is_empty() {
                let rendered = itertools::join(
                    metrics.values.iter().map(|(k, v)| format!("{}={}", k, v)),
                    ", ",
                );
                out.push_str(&format!("  Metrics: {}\n", rendered));
            }
            if let Some(recommendation) = &metrics.recommendation {
                out.push_str(&format!("  Recommendation: {}\n", recommendation));
            }

            if let Some(prev) = previous {
                let mut improving = Vec::new();
                let mut regressing = Vec::new();
                for metric in &config.lower_is_better {
                    if let (Some(before), Some(now)) = (prev.get(metric), metrics.get(metric)) {
                        if now < before {
                            improving.push(format!("{}: {} -> {}", metric, before, now));
                        } else if now > before {
                            regressing.push(format!("{}: {} -> {}", metric, before, now));
                        }
                    }
                }
                if !improving.is_empty() {
                    out.push_str(&format!("  IMPROVING: {}\n", improving.join(", ")));
                }
                if !regressing.is_empty() {
                    out.push_str(&format!("  REGRESSING: {}\n", regressing.join(", ")));
                }
            }
            if !metrics.values.is_empty() {
                previous = Some(metrics);
            }

            out.push_str(&format!(
                "  Key Output: {}\n",
                truncate_chars(&execution.snippet, SNIPPET_DISPLAY)
            ));
            out.push('\n');
        }
    }

    fn convergence(out: &mut String, analysis: &IterationAnalysis, config: &DiagnosisConfig) {
        let Some(summary) = &analysis.convergence else {
            return;
        };
        let label = config
            .convergence
            .as_ref()
            .map(|t| format!("{} / {}", t.node, t.metric))
            .unwrap_or_default();
        out.push_str(&format!("{}\n", "-".repeat(40)));
        out.push_str(&format!("TARGET CONVERGENCE ANALYSIS: {}\n", label));
        let values = itertools::join(summary.values.iter(), ", ");
        out.push_str(&format!("  Values: [{}]\n", values));
        out.push_str(&format!(
            "  Range: {:.2} - {:.2} (spread: {:.2})\n",
            summary.min, summary.max, summary.spread
        ));
        out.push_str(&format!("  Average: {:.2}\n", summary.mean));
        let assessment = match summary.verdict {
            ConvergenceVerdict::Converging => "Values are converging (good)",
            ConvergenceVerdict::ModerateVariance => "Values have moderate variance",
            ConvergenceVerdict::NotConverging => "Values are NOT converging (stuck loop!)",
            ConvergenceVerdict::Insufficient => "Not enough values to judge",
        };
        out.push_str(&format!("  ASSESSMENT: {}\n", assessment));
        out.push('\n');
    }

    fn loops(out: &mut String, analysis: &IterationAnalysis) {
        Self::banner(out, "LOOP DETECTION DETAILS");
        if analysis.loops.is_empty() {
            out.push_str("  No exact repeating patterns found.\n");
        }
        for pattern in analysis.loops.iter().take(LOOPS_SHOWN) {
            out.push_str(&format!(
                "  Pattern from iteration {} repeated at iteration {}\n",
                pattern.first_iteration, pattern.repeated_iteration
            ));
            let nodes = itertools::join(pattern.nodes.iter().take(LOOP_NODES_SHOWN), " -> ");
            out.push_str(&format!("    Nodes: {}\n", nodes));
        }
        out.push('\n');
    }

    fn execution_health(out: &mut String, analysis: &IterationAnalysis) {
        let execution = &analysis.execution;
        Self::banner(out, "EXECUTION HEALTH");
        out.push_str(&format!(
            "  Distinct nodes completed: {}\n",
            execution.nodes_executed.len()
        ));
        for error in &execution.errors {
            out.push_str(&format!(
                "  ERROR: {} - {}\n",
                error.node,
                error.error.as_deref().unwrap_or("unknown error")
            ));
        }
        for output in &execution.error_outputs {
            out.push_str(&format!("  ERROR OUTPUT: {} - {}\n", output.node, output.content));
        }
        for issue in &execution.verification_issues {
            out.push_str(&format!("  VERIFICATION: {}\n", issue));
        }
        if execution.is_clean && execution.error_outputs.is_empty() {
            out.push_str("  No execution problems recorded.\n");
        }
        out.push('\n');
    }
}
