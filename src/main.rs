use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hcloud_autoscaler::cli::{format_registry, Args};
use hcloud_autoscaler::cluster::BootstrapOptions;
use hcloud_autoscaler::config::load_cluster_config_file;
use hcloud_autoscaler::inventory::{load_inventory_snapshot_file, InMemoryInventory};
use hcloud_autoscaler::provider::{parse_resource_limit, HcloudCloudProvider, ResourceLimiter};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = args.env_file {
        if let Err(e) = dotenvy::from_path(env_file) {
            error!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
    }

    let provider = match build_provider(&args).await {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create Hetzner cloud provider: {:#}", e);
            process::exit(1);
        }
    };

    info!("Loaded {} node groups", provider.node_groups().len());
    println!("{}", format_registry(&provider));
}

async fn build_provider(args: &Args) -> anyhow::Result<HcloudCloudProvider> {
    let cluster_config = match args.cluster_config {
        Some(ref path) => Some(
            load_cluster_config_file(path)
                .with_context(|| format!("loading cluster config {}", path.display()))?,
        ),
        None => None,
    };

    let snapshot = load_inventory_snapshot_file(&args.inventory)
        .with_context(|| format!("loading inventory {}", args.inventory.display()))?;
    let inventory = Arc::new(InMemoryInventory::from_snapshot(snapshot));
    info!(
        "Loaded inventory snapshot with {} servers",
        inventory.server_count()
    );

    let mut limiter = ResourceLimiter::new();
    for value in &args.resource_limits {
        let (resource, min, max) = parse_resource_limit(value)?;
        limiter = limiter.with_limit(resource, min, max);
    }

    let options = BootstrapOptions::default()
        .with_placement_lookup_timeout(Duration::from_secs(args.placement_timeout));

    let provider = HcloudCloudProvider::build(
        &args.nodes,
        cluster_config.as_ref(),
        inventory,
        Some(limiter),
        &options,
    )
    .await?;

    Ok(provider)
}
