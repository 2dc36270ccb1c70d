//! Configuration for audits and iteration diagnosis.
//!
//! Everything that names a particular workflow's vocabulary (required nodes,
//! routing markers, the feedback pair, the terminal stage) is data supplied by
//! the caller. The defaults are workflow-agnostic: with them, vocabulary-driven
//! rules simply do not fire.

use crate::error::{ConfigError, KansaError, read_document};
use crate::workflow::conversion::{DocumentFormat, parse_value};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration, usually loaded from a YAML or JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KansaConfig {
    pub audit: AuditConfig,
    pub diagnosis: DiagnosisConfig,
}

impl KansaConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KansaError> {
        let path = path.as_ref();
        let text = read_document(path)?;
        Ok(Self::parse_as(&text, DocumentFormat::from_path(path))?)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Self::parse_as(text, DocumentFormat::sniff(text))
    }

    pub fn parse_as(text: &str, format: DocumentFormat) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value = parse_value(text, format).map_err(|e| ConfigError::Parse(e.to_string()))?;
        serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Settings for the structural audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Node ids that must exist for the workflow to count as complete.
    pub required_nodes: Vec<String>,
    /// Providers considered valid. Empty disables the check.
    pub known_providers: Vec<String>,
    /// Share of nodes (percent) above which one provider is flagged.
    pub provider_share_limit: f64,
    /// Upper bound on enumerated cycles.
    pub max_cycles: usize,
    /// Warn when a keyword condition's keywords are absent from the source node's role.
    pub check_keyword_prompts: bool,
    /// In-degree above which a node is flagged as a congestion point.
    pub max_in_degree: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            required_nodes: Vec::new(),
            known_providers: Vec::new(),
            provider_share_limit: 50.0,
            max_cycles: 1000,
            check_keyword_prompts: true,
            max_in_degree: 5,
        }
    }
}

impl AuditConfig {
    pub fn with_required_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_known_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_providers = providers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }
}

/// Two nodes that route work back and forth during revision loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPair {
    pub first: String,
    pub second: String,
}

/// The metric whose values decide whether iterations converge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceTarget {
    /// Node whose outputs carry the metric.
    pub node: String,
    pub metric: String,
}

/// Routing markers expected in one node's free-text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub node: String,
    pub markers: Vec<RoutingMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMarker {
    pub key: String,
    pub marker: String,
}

impl RoutingRule {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            markers: Vec::new(),
        }
    }

    pub fn marker(mut self, key: impl Into<String>, marker: impl Into<String>) -> Self {
        self.markers.push(RoutingMarker {
            key: key.into(),
            marker: marker.into(),
        });
        self
    }
}

/// A named regular expression whose first capture group is a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPattern {
    pub name: String,
    pub pattern: String,
}

impl MetricPattern {
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// Outputs of nodes whose id contains `node_contains` must mention `marker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRule {
    pub node_contains: String,
    pub marker: String,
}

/// Settings for the iteration diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    /// Node whose execution marks the workflow as finished.
    pub terminal_node: Option<String>,
    pub feedback_pair: Option<FeedbackPair>,
    /// Executions above which a node counts as excessive.
    pub execution_threshold: usize,
    pub convergence: Option<ConvergenceTarget>,
    pub routing_rules: Vec<RoutingRule>,
    pub metric_patterns: Vec<MetricPattern>,
    pub recommendation_pattern: Option<String>,
    /// Metrics where a decrease is an improvement.
    pub lower_is_better: Vec<String>,
    pub snippet_markers: Vec<String>,
    /// Nodes listed in the execution count table. Derived from the rules when empty.
    pub watched_nodes: Vec<String>,
    /// Iteration count treated as the runaway cap.
    pub max_iterations: u32,
    pub verification: Option<VerificationRule>,
    pub converging_spread: f64,
    pub moderate_spread: f64,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            terminal_node: None,
            feedback_pair: None,
            execution_threshold: 5,
            convergence: None,
            routing_rules: Vec::new(),
            metric_patterns: default_metric_patterns(),
            recommendation_pattern: Some(r"(BUY|SELL|HOLD|OVERVALUED|UNDERVALUED)".to_string()),
            lower_is_better: vec!["divergence".to_string()],
            snippet_markers: [
                "ROUTE:",
                "DECISION:",
                "RECOMMENDATION:",
                "CONCLUSION:",
                "DCF:",
                "VALIDATED",
                "NEEDS_",
                "PWV:",
                "TARGET:",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            watched_nodes: Vec::new(),
            max_iterations: 20,
            verification: None,
            converging_spread: 5.0,
            moderate_spread: 20.0,
        }
    }
}

fn default_metric_patterns() -> Vec<MetricPattern> {
    vec![
        MetricPattern::new(
            "dcf_target",
            r"(?:PWV|target|fair value)[:\s]*(?:HKD|USD|CNY)?\s*([\d.]+)",
        ),
        MetricPattern::new("divergence", r"divergence[:\s]*([\d.]+)%"),
        MetricPattern::new("wacc", r"WACC[:\s]*([\d.]+)%"),
        MetricPattern::new("score", r"(?:score|rating)[:\s]*([\d.]+)"),
    ]
}

impl DiagnosisConfig {
    pub fn with_terminal_node(mut self, node: impl Into<String>) -> Self {
        self.terminal_node = Some(node.into());
        self
    }

    pub fn with_feedback_pair(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.feedback_pair = Some(FeedbackPair {
            first: first.into(),
            second: second.into(),
        });
        self
    }

    pub fn with_convergence(mut self, node: impl Into<String>, metric: impl Into<String>) -> Self {
        self.convergence = Some(ConvergenceTarget {
            node: node.into(),
            metric: metric.into(),
        });
        self
    }

    pub fn with_routing_rule(mut self, rule: RoutingRule) -> Self {
        self.routing_rules.push(rule);
        self
    }

    pub fn with_execution_threshold(mut self, threshold: usize) -> Self {
        self.execution_threshold = threshold;
        self
    }

    pub fn with_verification(mut self, node_contains: &str, marker: &str) -> Self {
        self.verification = Some(VerificationRule {
            node_contains: node_contains.to_string(),
            marker: marker.to_string(),
        });
        self
    }

    /// Nodes shown in execution count tables: the explicit list, or every node a rule mentions.
    pub fn watched_nodes(&self) -> Vec<String> {
        if !self.watched_nodes.is_empty() {
            return self.watched_nodes.clone();
        }
        let mut nodes: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !nodes.iter().any(|n| n == name) {
                nodes.push(name.to_string());
            }
        };
        for rule in &self.routing_rules {
            push(&rule.node);
        }
        if let Some(pair) = &self.feedback_pair {
            push(&pair.first);
            push(&pair.second);
        }
        if let Some(target) = &self.convergence {
            push(&target.node);
        }
        if let Some(terminal) = &self.terminal_node {
            push(terminal);
        }
        nodes
    }
}

/// Log output format for the command line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// Reads `KANSA_LOG` and `KANSA_LOG_FORMAT` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup("KANSA_LOG").unwrap_or_else(|| "warn".to_string());
        let format = match lookup("KANSA_LOG_FORMAT")
            .unwrap_or_else(|| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self { level, format }
    }
}
