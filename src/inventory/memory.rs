//! In-memory inventory
//!
//! Backs the binary's offline validation mode (loaded from a snapshot file)
//! and the test suite. Failures and latency can be injected to exercise the
//! error paths of the node group core.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use super::{InventoryClient, InventoryError, InventoryServer};
use crate::cluster::node::parse_provider_id;
use crate::cluster::placement::PlacementGroup;

/// Errors loading an inventory snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Snapshot parse error: {0}")]
    ParseError(String),
}

/// Point-in-time copy of the provider inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub servers: Vec<InventoryServer>,

    #[serde(rename = "placementGroups")]
    #[serde(default)]
    pub placement_groups: Vec<PlacementGroup>,

    #[serde(rename = "serverTypes")]
    #[serde(default)]
    pub server_types: Vec<String>,
}

/// Parse a snapshot from YAML or JSON
pub fn parse_inventory_snapshot(content: &str) -> Result<InventorySnapshot, SnapshotError> {
    serde_yaml::from_str(content).map_err(|e| SnapshotError::ParseError(e.to_string()))
}

/// Load a snapshot file from disk
pub fn load_inventory_snapshot_file(path: &Path) -> Result<InventorySnapshot, SnapshotError> {
    let content = std::fs::read_to_string(path)?;
    parse_inventory_snapshot(&content)
}

/// Inventory held in process memory
#[derive(Default)]
pub struct InMemoryInventory {
    servers: DashMap<i64, InventoryServer>,
    placement_groups: DashMap<i64, PlacementGroup>,
    server_types: RwLock<Vec<String>>,

    failure: RwLock<Option<InventoryError>>,
    latency: RwLock<Option<Duration>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        let inventory = Self {
            server_types: RwLock::new(snapshot.server_types),
            ..Self::default()
        };
        for server in snapshot.servers {
            inventory.servers.insert(server.id, server);
        }
        for group in snapshot.placement_groups {
            inventory.placement_groups.insert(group.id, group);
        }
        inventory
    }

    /// Add a server (builder style)
    pub fn with_server(self, server: InventoryServer) -> Self {
        self.insert_server(server);
        self
    }

    /// Add a placement group (builder style)
    pub fn with_placement_group(self, group: PlacementGroup) -> Self {
        self.placement_groups.insert(group.id, group);
        self
    }

    pub fn insert_server(&self, server: InventoryServer) {
        self.servers.insert(server.id, server);
    }

    pub fn remove_server(&self, id: i64) -> Option<InventoryServer> {
        self.servers.remove(&id).map(|(_, s)| s)
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Make every subsequent call fail with `error` (or succeed again with `None`)
    pub async fn inject_failure(&self, error: Option<InventoryError>) {
        *self.failure.write().await = error;
    }

    /// Delay every subsequent call by `latency`
    pub async fn inject_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    async fn simulate_api(&self) -> Result<(), InventoryError> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.failure.read().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn list_instances(&self, group: &str) -> Result<Vec<InventoryServer>, InventoryError> {
        self.simulate_api().await?;
        let mut servers: Vec<InventoryServer> = self
            .servers
            .iter()
            .filter(|r| r.node_group() == Some(group))
            .map(|r| r.clone())
            .collect();
        servers.sort_by_key(|s| s.id);
        Ok(servers)
    }

    async fn find_instance(
        &self,
        provider_id: &str,
    ) -> Result<Option<InventoryServer>, InventoryError> {
        self.simulate_api().await?;
        Ok(parse_provider_id(provider_id).and_then(|id| self.servers.get(&id).map(|r| r.clone())))
    }

    async fn get_placement_group(
        &self,
        reference: &str,
    ) -> Result<Option<PlacementGroup>, InventoryError> {
        self.simulate_api().await?;
        if let Ok(id) = reference.parse::<i64>() {
            if let Some(group) = self.placement_groups.get(&id) {
                return Ok(Some(group.clone()));
            }
        }
        Ok(self
            .placement_groups
            .iter()
            .find(|r| r.name == reference)
            .map(|r| r.clone()))
    }

    async fn list_server_types(&self) -> Result<Vec<String>, InventoryError> {
        self.simulate_api().await?;
        Ok(self.server_types.read().await.clone())
    }
}
