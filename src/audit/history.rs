use super::AuditReport;
use serde::{Deserialize, Serialize};

/// Reports from earlier audits, owned by the caller.
///
/// Nothing in the crate keeps audit state between calls. A caller that wants
/// to compare runs keeps a history and passes it back in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditHistory {
    reports: Vec<AuditReport>,
}

impl AuditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: AuditReport) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[AuditReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// The most recent report for a workflow.
    pub fn latest(&self, workflow_name: &str) -> Option<&AuditReport> {
        self.reports
            .iter()
            .rev()
            .find(|r| r.workflow_name == workflow_name)
    }

    /// Critical issues in `report` that the previous report for the same workflow did not have.
    ///
    /// `report` itself may already be recorded; it is skipped. Every issue is new
    /// when there is no previous report.
    pub fn new_critical_issues(&self, report: &AuditReport) -> Vec<String> {
        let previous = self
            .reports
            .iter()
            .rev()
            .filter(|r| r.workflow_name == report.workflow_name)
            .find(|r| *r != report);
        match previous {
            Some(previous) => report
                .critical_issues
                .iter()
                .filter(|issue| !previous.critical_issues.contains(issue))
                .cloned()
                .collect(),
            None => report.critical_issues.clone(),
        }
    }
}
