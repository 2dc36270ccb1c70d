use crate::config::RoutingRule;
use serde::{Deserialize, Serialize};

/// Whether one routing marker appeared in an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerHit {
    pub key: String,
    pub marker: String,
    pub found: bool,
}

/// Checks every marker of a rule against the content, in rule order.
///
/// Matching is a plain case-sensitive substring test, since markers are
/// emitted verbatim by the routing node.
pub fn match_markers(rule: &RoutingRule, content: &str) -> Vec<MarkerHit> {
    rule.markers
        .iter()
        .map(|m| MarkerHit {
            key: m.key.clone(),
            marker: m.marker.clone(),
            found: content.contains(m.marker.as_str()),
        })
        .collect()
}

/// The key of the first marker found, which is the routing decision taken.
pub fn decision(hits: &[MarkerHit]) -> Option<&str> {
    hits.iter().find(|h| h.found).map(|h| h.key.as_str())
}
