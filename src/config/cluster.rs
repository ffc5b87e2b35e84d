use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while parsing the cluster config
#[derive(Error, Debug, PartialEq)]
pub enum ClusterConfigError {
    #[error("Cluster config parse error: {0}")]
    ParseError(String),
}

/// Per-group configuration, keyed by node group name in [`ClusterConfig`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Placement group name or id the group's servers are created in
    #[serde(rename = "placementGroup")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_group: Option<String>,
}

/// Explicit per-group cluster configuration.
///
/// Supplying one of these switches the registry into explicit mode: every
/// declared node group must have an entry in `node_configs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClusterConfig {
    #[serde(rename = "nodeConfigs")]
    #[serde(default)]
    pub node_configs: HashMap<String, NodeConfig>,
}

// ============================================================================
// SBIO: Pure parsing functions (no I/O)
// ============================================================================

/// Parse a cluster config from YAML or JSON.
///
/// A blank placement group reference is the same as none.
pub fn parse_cluster_config(content: &str) -> Result<ClusterConfig, ClusterConfigError> {
    let mut config: ClusterConfig = serde_yaml::from_str(content)
        .map_err(|e| ClusterConfigError::ParseError(e.to_string()))?;

    for node in config.node_configs.values_mut() {
        if matches!(node.placement_group.as_deref(), Some(r) if r.trim().is_empty()) {
            node.placement_group = None;
        }
    }

    Ok(config)
}

impl ClusterConfig {
    /// Look up the configuration for a node group
    pub fn node_config(&self, group: &str) -> Option<&NodeConfig> {
        self.node_configs.get(group)
    }

    /// Add a node config (builder style, mostly for tests and embedding)
    pub fn with_node(mut self, group: impl Into<String>, node: NodeConfig) -> Self {
        self.node_configs.insert(group.into(), node);
        self
    }
}

impl NodeConfig {
    /// A node config pinned to a placement group
    pub fn in_placement_group(reference: impl Into<String>) -> Self {
        Self {
            placement_group: Some(reference.into()),
        }
    }
}
