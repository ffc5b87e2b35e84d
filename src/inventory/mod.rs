//! Provider inventory collaborator
//!
//! The cloud API transport lives outside this crate. Everything the node group
//! core needs from it goes through [`InventoryClient`], which keeps the core
//! testable against the in-memory implementation.

pub mod memory;

pub use memory::{load_inventory_snapshot_file, InMemoryInventory, InventorySnapshot, SnapshotError};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::node::format_provider_id;
use crate::cluster::placement::PlacementGroup;
use crate::cluster::NODE_GROUP_LABEL;

/// Errors reported by the inventory collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// A live server as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryServer {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl InventoryServer {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            labels: HashMap::new(),
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Label the server as a member of a node group
    pub fn in_group(self, group: impl Into<String>) -> Self {
        self.with_label(NODE_GROUP_LABEL, group)
    }

    /// Node group named by the server's membership label
    pub fn node_group(&self) -> Option<&str> {
        self.labels.get(NODE_GROUP_LABEL).map(String::as_str)
    }

    /// Provider id the matching cluster node carries
    pub fn provider_id(&self) -> String {
        format_provider_id(self.id)
    }
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// All servers labelled as members of `group`
    async fn list_instances(&self, group: &str) -> Result<Vec<InventoryServer>, InventoryError>;

    /// The live server behind a node provider id, if it still exists
    async fn find_instance(
        &self,
        provider_id: &str,
    ) -> Result<Option<InventoryServer>, InventoryError>;

    /// Look up a placement group by name or id. `Ok(None)` means it does not exist.
    async fn get_placement_group(
        &self,
        reference: &str,
    ) -> Result<Option<PlacementGroup>, InventoryError>;

    /// Names of the server types that can be ordered
    async fn list_server_types(&self) -> Result<Vec<String>, InventoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builder() {
        let server = InventoryServer::new(42, "pool-a-1")
            .in_group("pool-a")
            .with_label("env", "prod");

        assert_eq!(server.node_group(), Some("pool-a"));
        assert_eq!(server.labels.get("env"), Some(&"prod".to_string()));
        assert_eq!(server.provider_id(), "hcloud://42");
    }

    #[test]
    fn test_server_without_group() {
        let server = InventoryServer::new(1, "bastion");
        assert_eq!(server.node_group(), None);
    }

    #[test]
    fn test_server_deserialization_defaults() {
        let server: InventoryServer = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(server.id, 7);
        assert!(server.name.is_empty());
        assert!(server.labels.is_empty());
    }
}
