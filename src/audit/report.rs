use crate::analysis::ConditionStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The result of a structural audit of one workflow definition.
///
/// A report is self-contained and serializes to JSON, so it can be stored and
/// compared across runs. `is_valid` is true exactly when `critical_issues` is
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub workflow_name: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub audited_at: DateTime<Utc>,
    pub node_count: usize,
    pub edge_count: usize,
    pub start_nodes: Vec<String>,
    pub end_nodes: Vec<String>,
    pub orphan_nodes: Vec<String>,
    pub unreachable_nodes: Vec<String>,
    pub missing_nodes: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub providers_used: BTreeMap<String, usize>,
    pub models_used: BTreeMap<String, usize>,
    pub tool_enabled_count: usize,
    pub condition_stats: ConditionStats,
    pub critical_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub is_valid: bool,
}

impl AuditReport {
    /// An empty report stamped with the current time.
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            workflow_id: None,
            audited_at: Utc::now(),
            node_count: 0,
            edge_count: 0,
            start_nodes: Vec::new(),
            end_nodes: Vec::new(),
            orphan_nodes: Vec::new(),
            unreachable_nodes: Vec::new(),
            missing_nodes: Vec::new(),
            cycles: Vec::new(),
            providers_used: BTreeMap::new(),
            models_used: BTreeMap::new(),
            tool_enabled_count: 0,
            condition_stats: ConditionStats::default(),
            critical_issues: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
            is_valid: true,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Total number of findings of any severity.
    pub fn issue_count(&self) -> usize {
        self.critical_issues.len() + self.warnings.len()
    }

    /// The provider with the most nodes, ties broken alphabetically.
    pub fn dominant_provider(&self) -> Option<(&str, usize)> {
        self.providers_used
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(p, c)| (p.as_str(), *c))
    }
}

const RULE: &str = "======================================================================";

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "WORKFLOW AUDIT: {}", self.workflow_name)?;
        writeln!(f, "{}", RULE)?;
        if let Some(id) = &self.workflow_id {
            writeln!(f, "Workflow id: {}", id)?;
        }
        writeln!(f, "Audited at: {}", self.audited_at.to_rfc3339())?;
        writeln!(
            f,
            "Status: {}",
            if self.is_valid { "VALID" } else { "INVALID" }
        )?;
        writeln!(f, "Nodes: {}  Edges: {}", self.node_count, self.edge_count)?;
        writeln!(f, "Start nodes: {}", self.start_nodes.join(", "))?;
        writeln!(f, "End nodes: {}", self.end_nodes.join(", "))?;
        writeln!(f, "Cycles: {}", self.cycles.len())?;
        for cycle in self.cycles.iter().take(5) {
            writeln!(f, "  {}", cycle.join(" -> "))?;
        }
        if self.cycles.len() > 5 {
            writeln!(f, "  ... and {} more", self.cycles.len() - 5)?;
        }

        writeln!(f)?;
        writeln!(f, "Providers:")?;
        for (provider, count) in &self.providers_used {
            writeln!(f, "  {}: {} nodes", provider, count)?;
        }
        writeln!(f, "Tool-enabled nodes: {}", self.tool_enabled_count)?;
        let stats = &self.condition_stats;
        writeln!(
            f,
            "Conditions: always={} keyword={} missing={} other={}",
            stats.always, stats.keyword, stats.missing, stats.other
        )?;

        let sections = [
            ("CRITICAL ISSUES", &self.critical_issues),
            ("WARNINGS", &self.warnings),
            ("RECOMMENDATIONS", &self.recommendations),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{} ({}):", title, items.len())?;
            for item in items {
                writeln!(f, "  - {}", item)?;
            }
        }
        write!(f, "{}", RULE)
    }
}
