pub mod cluster;
pub mod spec;

pub use cluster::{parse_cluster_config, ClusterConfig, ClusterConfigError, NodeConfig};
pub use spec::{is_valid_name, parse_node_group_spec, NodeGroupSpec, SpecError, SPEC_FORMAT};

use std::path::Path;
use thiserror::Error;

/// Errors for file I/O operations (separate from pure parsing errors)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cluster config error: {0}")]
    ClusterConfigError(#[from] ClusterConfigError),
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load and parse a cluster config file from disk.
pub fn load_cluster_config_file(path: &Path) -> Result<ClusterConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_cluster_config(&content)?;
    Ok(config)
}
