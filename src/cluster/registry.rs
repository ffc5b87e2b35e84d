//! Node group registry
//!
//! Built once at startup from the node group declarations, the optional
//! cluster config and the provider inventory. Bootstrap is all-or-nothing:
//! any inconsistency is returned as a [`BootstrapError`] and no registry is
//! produced.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info};

use super::coordinator::ScalingCoordinator;
use super::node_group::NodeGroup;
use super::placement::{oversized_placement_groups, PlacementGroup};
use super::{MAX_PLACEMENT_GROUP_SIZE, PLACEMENT_LOOKUP_TIMEOUT_SECS};
use crate::config::{parse_node_group_spec, ClusterConfig, SpecError};
use crate::inventory::{InventoryClient, InventoryError};

/// Fatal startup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BootstrapError {
    #[error("Failed to parse pool spec `{declaration}`: {source}")]
    InvalidSpec {
        declaration: String,
        source: SpecError,
    },

    #[error("Node group `{0}` is declared more than once")]
    DuplicateNodeGroup(String),

    #[error("No cluster config present")]
    NoClusterConfig,

    #[error("No node config present for node group id `{0}`")]
    MissingNodeConfig(String),

    #[error("Failed to get servers for node pool {group}: {source}")]
    Inventory {
        group: String,
        source: InventoryError,
    },

    #[error("Timed out checking if placement group `{0}` exists")]
    PlacementLookupTimeout(String),

    #[error("Failed to verify if placement group `{reference}` exists: {source}")]
    PlacementLookupFailed {
        reference: String,
        source: InventoryError,
    },

    #[error("The requested placement group `{0}` does not appear to exist")]
    PlacementGroupNotFound(String),

    #[error(
        "The following placement groups have a potential size over the allowed maximum of {max}: {}",
        join_ids(.ids)
    )]
    OversizedPlacementGroups { max: usize, ids: Vec<i64> },
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from registry operations after startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Node group '{0}' not found")]
    NodeGroupNotFound(String),

    #[error("Failed to get servers for node group {group}: {source}")]
    Inventory {
        group: String,
        source: InventoryError,
    },
}

/// Startup limits
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Deadline for each placement group lookup
    pub placement_lookup_timeout: Duration,

    /// Largest combined max size per placement group
    pub max_placement_group_size: usize,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            placement_lookup_timeout: Duration::from_secs(PLACEMENT_LOOKUP_TIMEOUT_SECS),
            max_placement_group_size: MAX_PLACEMENT_GROUP_SIZE,
        }
    }
}

impl BootstrapOptions {
    pub fn with_placement_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.placement_lookup_timeout = timeout;
        self
    }
}

/// Owns every node group of the cluster
pub struct NodeGroupRegistry {
    groups: DashMap<String, Arc<NodeGroup>>,
    coordinator: ScalingCoordinator,
    inventory: Arc<dyn InventoryClient>,
    max_placement_group_size: usize,
}

impl NodeGroupRegistry {
    /// Build the registry.
    ///
    /// `cluster_config` switches on explicit per-group configuration: every
    /// declared group then needs a node config, and node configs may name a
    /// placement group that must exist.
    pub async fn bootstrap<S: AsRef<str>>(
        declarations: &[S],
        cluster_config: Option<&ClusterConfig>,
        inventory: Arc<dyn InventoryClient>,
        options: &BootstrapOptions,
    ) -> Result<Self, BootstrapError> {
        if matches!(cluster_config, Some(config) if config.node_configs.is_empty()) {
            return Err(BootstrapError::NoClusterConfig);
        }

        let coordinator = ScalingCoordinator::new();
        let mut groups: HashMap<String, Arc<NodeGroup>> = HashMap::new();

        for declaration in declarations {
            let declaration = declaration.as_ref();
            let spec =
                parse_node_group_spec(declaration).map_err(|source| BootstrapError::InvalidSpec {
                    declaration: declaration.to_string(),
                    source,
                })?;

            if groups.contains_key(&spec.name) {
                return Err(BootstrapError::DuplicateNodeGroup(spec.name));
            }

            let node_config = match cluster_config {
                Some(config) => Some(
                    config
                        .node_config(&spec.name)
                        .ok_or_else(|| BootstrapError::MissingNodeConfig(spec.name.clone()))?,
                ),
                None => None,
            };

            let servers = inventory
                .list_instances(&spec.name)
                .await
                .map_err(|source| BootstrapError::Inventory {
                    group: spec.name.clone(),
                    source,
                })?;

            let mut group = NodeGroup::new(&spec, servers.len(), coordinator.clone());

            if let Some(reference) = node_config.and_then(|c| c.placement_group.as_deref()) {
                let placement = resolve_placement_group(
                    inventory.as_ref(),
                    reference,
                    options.placement_lookup_timeout,
                )
                .await?;
                debug!(
                    group = %spec.name,
                    placement_group = placement.id,
                    "resolved placement group"
                );
                group = group.with_placement_group(placement);
            }

            info!(
                group = %spec.name,
                min = group.min_size(),
                max = group.max_size(),
                target = group.target_size(),
                "registered node group"
            );
            groups.insert(spec.name, Arc::new(group));
        }

        let oversized = oversized_placement_groups(
            groups.values().map(|g| g.as_ref()),
            options.max_placement_group_size,
        );
        if !oversized.is_empty() {
            return Err(BootstrapError::OversizedPlacementGroups {
                max: options.max_placement_group_size,
                ids: oversized,
            });
        }

        Ok(Self {
            groups: groups.into_iter().collect(),
            coordinator,
            inventory,
            max_placement_group_size: options.max_placement_group_size,
        })
    }

    /// Get a node group by id
    pub fn get(&self, id: &str) -> Option<Arc<NodeGroup>> {
        self.groups.get(id).map(|r| r.clone())
    }

    /// All node groups, in no particular order
    pub fn groups(&self) -> Vec<Arc<NodeGroup>> {
        self.groups.iter().map(|r| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The lock shared by every group in this registry
    pub fn coordinator(&self) -> &ScalingCoordinator {
        &self.coordinator
    }

    /// Placement group capacity this registry was checked against
    pub fn max_placement_group_size(&self) -> usize {
        self.max_placement_group_size
    }

    pub fn inventory(&self) -> &Arc<dyn InventoryClient> {
        &self.inventory
    }

    /// Reset every target size to zero until the next inventory read.
    pub async fn refresh(&self) {
        for group in self.groups() {
            group.reset_target_size(0).await;
        }
        debug!(groups = self.len(), "reset node group target sizes");
    }

    /// Re-seed one group's target size from the live server count.
    ///
    /// The count is read and stored under the scaling lock.
    pub async fn resync(&self, id: &str) -> Result<usize, RegistryError> {
        let group = self
            .get(id)
            .ok_or_else(|| RegistryError::NodeGroupNotFound(id.to_string()))?;
        group
            .reseed_with(|| async move {
                self.inventory
                    .list_instances(id)
                    .await
                    .map(|servers| servers.len())
                    .map_err(|source| RegistryError::Inventory {
                        group: id.to_string(),
                        source,
                    })
            })
            .await
    }

    /// Re-seed every group's target size from the live server count
    pub async fn resync_all(&self) -> Result<(), RegistryError> {
        let ids: Vec<String> = self.groups.iter().map(|r| r.key().clone()).collect();
        try_join_all(ids.iter().map(|id| self.resync(id))).await?;
        Ok(())
    }

    /// Provider ids of the group's live servers
    pub async fn instances(&self, id: &str) -> Result<Vec<String>, RegistryError> {
        if !self.groups.contains_key(id) {
            return Err(RegistryError::NodeGroupNotFound(id.to_string()));
        }
        let servers = self
            .inventory
            .list_instances(id)
            .await
            .map_err(|source| RegistryError::Inventory {
                group: id.to_string(),
                source,
            })?;
        Ok(servers.iter().map(|s| s.provider_id()).collect())
    }
}

async fn resolve_placement_group(
    inventory: &dyn InventoryClient,
    reference: &str,
    timeout: Duration,
) -> Result<PlacementGroup, BootstrapError> {
    match tokio::time::timeout(timeout, inventory.get_placement_group(reference)).await {
        Err(_) => Err(BootstrapError::PlacementLookupTimeout(reference.to_string())),
        Ok(Err(source)) => Err(BootstrapError::PlacementLookupFailed {
            reference: reference.to_string(),
            source,
        }),
        Ok(Ok(None)) => Err(BootstrapError::PlacementGroupNotFound(reference.to_string())),
        Ok(Ok(Some(placement))) => Ok(placement),
    }
}
