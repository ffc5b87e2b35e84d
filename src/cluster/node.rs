//! Cluster node - the orchestrator's view of a machine
//!
//! Only the parts the node group core reads are modelled: the name, the
//! provider id and the labels.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{GPU_LABEL, NODE_GROUP_LABEL, PROVIDER_ID_PREFIX};

/// A node as reported by the cluster API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub name: String,

    /// e.g. `hcloud://12345`; empty for nodes that are not registered yet
    #[serde(rename = "providerID")]
    #[serde(default)]
    pub provider_id: String,

    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider_id: provider_id.into(),
            labels: HashMap::new(),
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Label the node as a member of a node group
    pub fn in_group(self, group: impl Into<String>) -> Self {
        self.with_label(NODE_GROUP_LABEL, group)
    }

    /// Node group named by the node's own membership label
    pub fn node_group(&self) -> Option<&str> {
        self.labels.get(NODE_GROUP_LABEL).map(String::as_str)
    }

    /// Value of the GPU label, if the node carries one
    pub fn gpu_type(&self) -> Option<&str> {
        self.labels.get(GPU_LABEL).map(String::as_str)
    }

    /// Whether the provider id carries this provider's scheme
    pub fn is_hcloud(&self) -> bool {
        self.provider_id.starts_with(PROVIDER_ID_PREFIX)
    }
}

/// Build the provider id for a server id
pub fn format_provider_id(server_id: i64) -> String {
    format!("{}{}", PROVIDER_ID_PREFIX, server_id)
}

/// Extract the server id from a provider id.
///
/// Returns `None` for ids of other providers and for malformed ids.
pub fn parse_provider_id(provider_id: &str) -> Option<i64> {
    provider_id
        .strip_prefix(PROVIDER_ID_PREFIX)
        .and_then(|id| id.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_round_trip() {
        assert_eq!(format_provider_id(12345), "hcloud://12345");
        assert_eq!(parse_provider_id("hcloud://12345"), Some(12345));
    }

    #[test]
    fn test_parse_foreign_or_malformed_ids() {
        assert_eq!(parse_provider_id(""), None);
        assert_eq!(parse_provider_id("12345"), None);
        assert_eq!(parse_provider_id("aws:///eu-west-1a/i-0abc"), None);
        assert_eq!(parse_provider_id("hcloud://"), None);
        assert_eq!(parse_provider_id("hcloud://abc"), None);
    }

    #[test]
    fn test_node_labels() {
        let node = ClusterNode::new("worker-1", "hcloud://1")
            .in_group("pool-a")
            .with_label(GPU_LABEL, "a100");

        assert!(node.is_hcloud());
        assert_eq!(node.node_group(), Some("pool-a"));
        assert_eq!(node.gpu_type(), Some("a100"));
    }

    #[test]
    fn test_node_without_labels() {
        let node = ClusterNode::new("worker-1", "");
        assert!(!node.is_hcloud());
        assert_eq!(node.node_group(), None);
        assert_eq!(node.gpu_type(), None);
    }

    #[test]
    fn test_node_deserialization() {
        let json = r#"{
            "name": "worker-2",
            "providerID": "hcloud://2",
            "labels": {"hcloud/node-group": "pool-b"}
        }"#;
        let node: ClusterNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.provider_id, "hcloud://2");
        assert_eq!(node.node_group(), Some("pool-b"));
    }
}
