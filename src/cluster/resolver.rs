//! Node → node group resolution
//!
//! Inventory and cluster views drift: a server can be deleted while its node
//! object lingers, or a node can register before the server is visible. The
//! resolver tolerates this by asking the inventory first and falling back to
//! the node's own label. Ownership is always label driven; a live server
//! without a group label is unowned.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::node::ClusterNode;
use super::node_group::NodeGroup;
use super::registry::NodeGroupRegistry;
use crate::inventory::{InventoryError, InventoryServer};

/// Errors while resolving a node
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("failed to check if server {provider_id} exists: {source}")]
    InstanceLookup {
        provider_id: String,
        source: InventoryError,
    },
}

/// Where the owning group's name was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipSource {
    /// Group label of the live server
    Inventory,
    /// Group label of the cluster node object
    NodeLabel,
}

/// Outcome of resolving a node
#[derive(Debug, Clone)]
pub enum Ownership {
    Owned {
        group: Arc<NodeGroup>,
        source: OwnershipSource,
    },
    /// The source that was consulted had no group label
    Unlabelled(OwnershipSource),
    /// The label names a group this registry does not manage
    UnknownGroup {
        name: String,
        source: OwnershipSource,
    },
}

impl Ownership {
    pub fn group(&self) -> Option<&Arc<NodeGroup>> {
        match self {
            Ownership::Owned { group, .. } => Some(group),
            _ => None,
        }
    }

    pub fn into_group(self) -> Option<Arc<NodeGroup>> {
        match self {
            Ownership::Owned { group, .. } => Some(group),
            _ => None,
        }
    }

    pub fn source(&self) -> OwnershipSource {
        match self {
            Ownership::Owned { source, .. }
            | Ownership::Unlabelled(source)
            | Ownership::UnknownGroup { source, .. } => *source,
        }
    }
}

/// Resolves cluster nodes against a registry
#[derive(Clone)]
pub struct NodeResolver {
    registry: Arc<NodeGroupRegistry>,
}

impl NodeResolver {
    pub fn new(registry: Arc<NodeGroupRegistry>) -> Self {
        Self { registry }
    }

    /// Determine which node group owns `node`.
    ///
    /// Only a failed inventory lookup is an error; every "not ours" outcome
    /// is an [`Ownership`] variant.
    pub async fn resolve(&self, node: &ClusterNode) -> Result<Ownership, ResolveError> {
        let (source, label) = match self.live_server(node).await? {
            Some(server) => (OwnershipSource::Inventory, server.node_group().map(String::from)),
            None => {
                debug!(node = %node.name, "failed to find hcloud server for node");
                (OwnershipSource::NodeLabel, node.node_group().map(String::from))
            }
        };

        let Some(name) = label else {
            return Ok(Ownership::Unlabelled(source));
        };

        Ok(match self.registry.get(&name) {
            Some(group) => Ownership::Owned { group, source },
            None => Ownership::UnknownGroup { name, source },
        })
    }

    /// Live server behind the node; nodes of other providers have none
    async fn live_server(&self, node: &ClusterNode) -> Result<Option<InventoryServer>, ResolveError> {
        if !node.is_hcloud() {
            return Ok(None);
        }
        self.registry
            .inventory()
            .find_instance(&node.provider_id)
            .await
            .map_err(|source| ResolveError::InstanceLookup {
                provider_id: node.provider_id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::registry::BootstrapOptions;
    use crate::inventory::InMemoryInventory;

    async fn setup() -> (NodeResolver, Arc<InMemoryInventory>) {
        let inventory = Arc::new(
            InMemoryInventory::new()
                .with_server(InventoryServer::new(1, "a-1").in_group("pool-a"))
                .with_server(InventoryServer::new(2, "unlabelled"))
                .with_server(InventoryServer::new(3, "x-1").in_group("pool-x")),
        );
        let registry = NodeGroupRegistry::bootstrap(
            &["0:5:cx22:nbg1:pool-a", "0:5:cx22:nbg1:pool-b"],
            None,
            inventory.clone(),
            &BootstrapOptions::default(),
        )
        .await
        .unwrap();
        (NodeResolver::new(Arc::new(registry)), inventory)
    }

    #[tokio::test]
    async fn test_live_server_label_wins() {
        let (resolver, _) = setup().await;
        // The node label disagrees; the server's label decides.
        let node = ClusterNode::new("a-1", "hcloud://1").in_group("pool-b");

        let ownership = resolver.resolve(&node).await.unwrap();
        assert_eq!(ownership.group().map(|g| g.id()), Some("pool-a"));
        assert_eq!(ownership.source(), OwnershipSource::Inventory);
    }

    #[tokio::test]
    async fn test_falls_back_to_node_label() {
        let (resolver, _) = setup().await;
        let node = ClusterNode::new("b-9", "hcloud://999").in_group("pool-b");

        let ownership = resolver.resolve(&node).await.unwrap();
        assert_eq!(ownership.group().map(|g| g.id()), Some("pool-b"));
        assert_eq!(ownership.source(), OwnershipSource::NodeLabel);
    }

    #[tokio::test]
    async fn test_deleted_server_falls_back() {
        let (resolver, inventory) = setup().await;
        let node = ClusterNode::new("a-1", "hcloud://1").in_group("pool-a");

        inventory.remove_server(1);
        let ownership = resolver.resolve(&node).await.unwrap();
        assert_eq!(ownership.group().map(|g| g.id()), Some("pool-a"));
        assert_eq!(ownership.source(), OwnershipSource::NodeLabel);
    }

    #[tokio::test]
    async fn test_no_server_no_label_is_unowned() {
        let (resolver, _) = setup().await;
        let node = ClusterNode::new("stray", "hcloud://999");

        let ownership = resolver.resolve(&node).await.unwrap();
        assert!(matches!(ownership, Ownership::Unlabelled(OwnershipSource::NodeLabel)));
    }

    #[tokio::test]
    async fn test_unlabelled_live_server_is_unowned() {
        let (resolver, _) = setup().await;
        // Even with a node label, an unlabelled live server means unowned.
        let node = ClusterNode::new("unlabelled", "hcloud://2").in_group("pool-a");

        let ownership = resolver.resolve(&node).await.unwrap();
        assert!(matches!(ownership, Ownership::Unlabelled(OwnershipSource::Inventory)));
    }

    #[tokio::test]
    async fn test_unknown_group_is_unowned() {
        let (resolver, _) = setup().await;
        let node = ClusterNode::new("x-1", "hcloud://3");

        let ownership = resolver.resolve(&node).await.unwrap();
        assert!(matches!(
            ownership,
            Ownership::UnknownGroup { ref name, source: OwnershipSource::Inventory } if name == "pool-x"
        ));
        assert!(ownership.into_group().is_none());
    }

    #[tokio::test]
    async fn test_foreign_provider_id_skips_inventory() {
        let (resolver, inventory) = setup().await;
        inventory
            .inject_failure(Some(InventoryError::Transport("down".to_string())))
            .await;

        let node = ClusterNode::new("edge-1", "").in_group("pool-b");
        let ownership = resolver.resolve(&node).await.unwrap();
        assert_eq!(ownership.group().map(|g| g.id()), Some("pool-b"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_error() {
        let (resolver, inventory) = setup().await;
        inventory
            .inject_failure(Some(InventoryError::Transport("down".to_string())))
            .await;

        let node = ClusterNode::new("a-1", "hcloud://1").in_group("pool-a");
        let result = resolver.resolve(&node).await;
        assert!(matches!(
            result,
            Err(ResolveError::InstanceLookup { ref provider_id, .. }) if provider_id == "hcloud://1"
        ));
    }
}
