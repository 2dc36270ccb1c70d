//! Signals read from free-text node outputs: routing markers, quality metrics
//! and key snippets.

use crate::config::{DiagnosisConfig, RoutingRule};
use crate::error::ConfigError;
use crate::trace::ExecutionTrace;
use serde::{Deserialize, Serialize};

pub mod metrics;
pub mod routing;
pub mod snippet;

pub use metrics::{MetricExtractor, QualityMetricSample};
pub use routing::{MarkerHit, decision, match_markers};
pub use snippet::{key_snippet, truncate_chars};

/// What one execution of a node produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecution {
    /// 1-based position among the node's outputs.
    pub execution: usize,
    pub timestamp: Option<String>,
    /// Output length in characters.
    pub length: usize,
    pub markers: Vec<MarkerHit>,
    /// Key of the first marker found, if the node has a routing rule.
    pub decision: Option<String>,
    pub metrics: QualityMetricSample,
    pub snippet: String,
}

/// Extracts signals from node outputs using the configured vocabulary.
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    metrics: MetricExtractor,
    rules: Vec<RoutingRule>,
    snippet_markers: Vec<String>,
}

impl SignalExtractor {
    pub fn new(config: &DiagnosisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            metrics: MetricExtractor::new(config)?,
            rules: config.routing_rules.clone(),
            snippet_markers: config.snippet_markers.clone(),
        })
    }

    pub fn rule_for(&self, node: &str) -> Option<&RoutingRule> {
        self.rules.iter().find(|r| r.node == node)
    }

    /// Signals for every execution of a node, oldest first.
    pub fn progression(&self, trace: &ExecutionTrace, node: &str) -> Vec<NodeExecution> {
        let rule = self.rule_for(node);
        trace
            .outputs(node)
            .iter()
            .enumerate()
            .map(|(i, output)| {
                let markers = rule
                    .map(|r| match_markers(r, &output.content))
                    .unwrap_or_default();
                NodeExecution {
                    execution: i + 1,
                    timestamp: output.timestamp.clone(),
                    length: output.content.chars().count(),
                    decision: decision(&markers).map(str::to_string),
                    markers,
                    metrics: self.metrics.extract(&output.content),
                    snippet: key_snippet(&output.content, &self.snippet_markers),
                }
            })
            .collect()
    }

    /// Values of one metric across a node's executions, skipping executions without it.
    pub fn metric_series(&self, trace: &ExecutionTrace, node: &str, metric: &str) -> Vec<f64> {
        trace
            .outputs(node)
            .iter()
            .filter_map(|output| self.metrics.extract(&output.content).get(metric))
            .collect()
    }
}
