use super::GraphAnalyzer;
use crate::audit::AuditReport;
use crate::config::AuditConfig;
use crate::error::AnalysisError;
use crate::workflow::WorkflowGraph;
use std::collections::BTreeMap;

/// One provider's share of the workflow's nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderShare {
    /// Lower-cased provider name.
    pub provider: String,
    pub nodes: Vec<String>,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderDistribution {
    /// Providers in order of first appearance.
    pub providers: Vec<ProviderShare>,
    pub models: BTreeMap<String, usize>,
    pub nodes_with_tools: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProviderDistribution {
    pub fn tool_enabled_count(&self) -> usize {
        self.nodes_with_tools.len()
    }
}

/// Groups nodes by provider and model and flags over-reliance on one provider.
///
/// A provider holding more than `share_limit` percent of the nodes is reported
/// as a single point of failure. When `known_providers` is non-empty, agent
/// nodes using any other provider are reported as well.
pub fn analyze_providers(
    graph: &WorkflowGraph,
    share_limit: f64,
    known_providers: &[String],
) -> ProviderDistribution {
    let mut distribution = ProviderDistribution::default();
    let total = graph.node_count();

    for node in graph.nodes() {
        let provider = node.provider.to_lowercase();
        match distribution.providers.iter_mut().find(|p| p.provider == provider) {
            Some(share) => share.nodes.push(node.id.clone()),
            None => distribution.providers.push(ProviderShare {
                provider: provider.clone(),
                nodes: vec![node.id.clone()],
                percentage: 0.0,
            }),
        }
        *distribution.models.entry(node.model.clone()).or_insert(0) += 1;
        if node.has_tools {
            distribution.nodes_with_tools.push(node.id.clone());
        }

        if !known_providers.is_empty()
            && node.node_type == "agent"
            && !known_providers.iter().any(|k| k.eq_ignore_ascii_case(&provider))
        {
            distribution
                .warnings
                .push(format!("{}: Unknown provider '{}'", node.id, node.provider));
        }
    }

    for share in &mut distribution.providers {
        share.percentage = share.nodes.len() as f64 / total as f64 * 100.0;
        if share.percentage > share_limit {
            distribution.warnings.push(format!(
                "Over-reliance on {} ({:.1}% of nodes)",
                share.provider, share.percentage
            ));
        }
    }

    distribution
}

/// Adds provider, model and tooling statistics to the report.
pub struct ProviderDistributionAnalyzer;

impl GraphAnalyzer for ProviderDistributionAnalyzer {
    fn name(&self) -> &str {
        "providers"
    }

    fn apply(
        &self,
        graph: &WorkflowGraph,
        config: &AuditConfig,
        report: &mut AuditReport,
    ) -> Result<(), AnalysisError> {
        let distribution =
            analyze_providers(graph, config.provider_share_limit, &config.known_providers);
        report.providers_used = distribution
            .providers
            .iter()
            .map(|p| (p.provider.clone(), p.nodes.len()))
            .collect();
        report.tool_enabled_count = distribution.tool_enabled_count();
        report.models_used = distribution.models;
        report.warnings.extend(distribution.warnings);
        Ok(())
    }
}
