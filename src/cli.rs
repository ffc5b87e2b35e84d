use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hcloud-autoscaler")]
#[command(about = "Validate Hetzner Cloud node groups against the provider inventory")]
#[command(version)]
pub struct Args {
    /// Node group declaration `<min-servers>:<max-servers>:<machine-type>:<region>:<name>` (repeatable)
    #[arg(long = "nodes", value_name = "SPEC", required = true)]
    pub nodes: Vec<String>,

    /// Cluster config file (YAML or JSON); enables explicit per-group configuration
    #[arg(long, value_name = "FILE", env = "HCLOUD_CLUSTER_CONFIG_FILE")]
    pub cluster_config: Option<PathBuf>,

    /// Inventory snapshot file (YAML or JSON) to validate against
    #[arg(long, value_name = "FILE", env = "HCLOUD_INVENTORY_FILE")]
    pub inventory: PathBuf,

    /// Resource limit `<resource>=<min>:<max>` (repeatable)
    #[arg(long = "resource-limit", value_name = "LIMIT")]
    pub resource_limits: Vec<String>,

    /// Placement group lookup timeout in seconds
    #[arg(long, default_value = "10")]
    pub placement_timeout: u64,

    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a .env file for loading environment overrides
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,
}

// ============================================================================
// SBIO: Pure display logic (no I/O - returns formatted strings)
// ============================================================================

use crate::cluster::placement::placement_group_totals;
use crate::provider::HcloudCloudProvider;

/// Format a summary of the bootstrapped provider.
/// Pure function - returns a formatted string.
pub fn format_registry(provider: &HcloudCloudProvider) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} provider v{} - Node Groups\n\n",
        provider.name(),
        env!("CARGO_PKG_VERSION")
    ));

    let mut groups = provider.node_groups();
    groups.sort_by(|a, b| a.id().cmp(b.id()));

    output.push_str(&format!("Node Groups ({}):\n", groups.len()));
    for group in &groups {
        output.push_str(&format!(
            "  [{}] {}/{} min={} max={} target={}\n",
            group.id(),
            group.instance_type(),
            group.region(),
            group.min_size(),
            group.max_size(),
            group.target_size()
        ));
        if let Some(placement) = group.placement_group() {
            let name = if placement.name.is_empty() {
                "-"
            } else {
                placement.name.as_str()
            };
            output.push_str(&format!("      Placement group: {} ({})\n", placement.id, name));
        }
    }

    let totals = placement_group_totals(groups.iter().map(|g| g.as_ref()));
    if !totals.is_empty() {
        output.push_str(&format!(
            "\nPlacement Groups (max combined size {}):\n",
            provider.registry().max_placement_group_size()
        ));
        for (id, total) in totals {
            output.push_str(&format!("  {} -> {}\n", id, total));
        }
    }

    if let Some(limiter) = provider.resource_limiter() {
        let resources = limiter.resources();
        if !resources.is_empty() {
            output.push_str("\nResource Limits:\n");
            for resource in resources {
                output.push_str(&format!(
                    "  {}: {}..{}\n",
                    resource,
                    limiter.min(resource),
                    limiter.max(resource)
                ));
            }
        }
    }

    output
}
