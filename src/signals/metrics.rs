use crate::config::DiagnosisConfig;
use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality metrics read from one node output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetricSample {
    pub values: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl QualityMetricSample {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.recommendation.is_none()
    }
}

/// Compiled metric patterns.
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    patterns: Vec<(String, Regex)>,
    recommendation: Option<Regex>,
}

fn compile(name: &str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            name: name.to_string(),
            message: e.to_string(),
        })
}

impl MetricExtractor {
    /// Compiles the configured patterns, rejecting any invalid one.
    pub fn new(config: &DiagnosisConfig) -> Result<Self, ConfigError> {
        let patterns = config
            .metric_patterns
            .iter()
            .map(|p| compile(&p.name, &p.pattern).map(|re| (p.name.clone(), re)))
            .collect::<Result<Vec<_>, _>>()?;
        let recommendation = config
            .recommendation_pattern
            .as_deref()
            .map(|p| compile("recommendation", p))
            .transpose()?;
        Ok(Self {
            patterns,
            recommendation,
        })
    }

    /// Reads every metric from the content.
    ///
    /// Each pattern contributes the first capture group of its first match.
    /// A metric whose capture does not parse as a number is left out.
    pub fn extract(&self, content: &str) -> QualityMetricSample {
        let mut sample = QualityMetricSample::default();
        for (name, regex) in &self.patterns {
            let value = regex
                .captures(content)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());
            if let Some(value) = value {
                sample.values.insert(name.clone(), value);
            }
        }
        if let Some(regex) = &self.recommendation {
            sample.recommendation = regex
                .captures(content)
                .and_then(|c| c.get(1).or_else(|| c.get(0)))
                .map(|m| m.as_str().to_uppercase());
        }
        sample
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(name, _)| name.as_str())
    }
}
