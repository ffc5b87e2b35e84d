//! # Cloud provider facade
//!
//! The surface the autoscaling control loop talks to. It composes the node
//! group registry, the node resolver and the shared scaling lock, and reports
//! capabilities this backend does not offer as [`ProviderError::NotImplemented`].

pub mod limits;

pub use limits::{parse_resource_limit, GpuConfig, LimitError, ResourceLimiter, GPU_RESOURCE_NAME};

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::cluster::{
    BootstrapError, BootstrapOptions, ClusterNode, NodeGroup, NodeGroupRegistry, NodeResolver,
    Ownership, RegistryError, ResolveError, ScalingError, GPU_LABEL,
};
use crate::config::ClusterConfig;
use crate::inventory::{InventoryClient, InventoryError};

/// Name the provider registers under
pub const PROVIDER_NAME: &str = "hetzner";

/// Errors returned to the control loop
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Not implemented")]
    NotImplemented,

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Scaling error: {0}")]
    Scaling(#[from] ScalingError),

    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
}

/// The Hetzner Cloud provider
pub struct HcloudCloudProvider {
    registry: Arc<NodeGroupRegistry>,
    resolver: NodeResolver,
    resource_limiter: Option<ResourceLimiter>,
}

impl HcloudCloudProvider {
    /// Bootstrap the registry and wrap it.
    ///
    /// Any configuration, placement or capacity problem is returned as a
    /// [`BootstrapError`]; the caller decides whether that ends the process.
    pub async fn build<S: AsRef<str>>(
        declarations: &[S],
        cluster_config: Option<&ClusterConfig>,
        inventory: Arc<dyn InventoryClient>,
        resource_limiter: Option<ResourceLimiter>,
        options: &BootstrapOptions,
    ) -> Result<Self, BootstrapError> {
        let registry =
            NodeGroupRegistry::bootstrap(declarations, cluster_config, inventory, options).await?;
        Ok(Self::from_registry(Arc::new(registry), resource_limiter))
    }

    pub fn from_registry(
        registry: Arc<NodeGroupRegistry>,
        resource_limiter: Option<ResourceLimiter>,
    ) -> Self {
        Self {
            resolver: NodeResolver::new(registry.clone()),
            registry,
            resource_limiter,
        }
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    pub fn registry(&self) -> &Arc<NodeGroupRegistry> {
        &self.registry
    }

    /// All configured node groups
    pub fn node_groups(&self) -> Vec<Arc<NodeGroup>> {
        self.registry.groups()
    }

    pub fn node_group(&self, id: &str) -> Option<Arc<NodeGroup>> {
        self.registry.get(id)
    }

    /// The node group owning `node`, `None` if the node should be ignored
    pub async fn node_group_for_node(
        &self,
        node: &ClusterNode,
    ) -> Result<Option<Arc<NodeGroup>>, ProviderError> {
        let ownership = self.resolver.resolve(node).await?;
        if let Ownership::UnknownGroup { ref name, .. } = ownership {
            debug!(node = %node.name, group = %name, "node labelled with unmanaged group");
        }
        Ok(ownership.into_group())
    }

    pub fn has_instance(&self, _node: &ClusterNode) -> Result<bool, ProviderError> {
        Err(ProviderError::NotImplemented)
    }

    pub fn pricing(&self) -> Result<Infallible, ProviderError> {
        Err(ProviderError::NotImplemented)
    }

    /// Server types that can be ordered
    pub async fn available_machine_types(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.registry.inventory().list_server_types().await?)
    }

    /// Node groups are only created from declarations at startup
    pub fn new_node_group(
        &self,
        _machine_type: &str,
        _labels: &HashMap<String, String>,
    ) -> Result<Arc<NodeGroup>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }

    pub fn resource_limiter(&self) -> Option<&ResourceLimiter> {
        self.resource_limiter.as_ref()
    }

    pub fn gpu_label(&self) -> &'static str {
        GPU_LABEL
    }

    /// GPU types are not advertised by this provider
    pub fn available_gpu_types(&self) -> HashSet<String> {
        HashSet::new()
    }

    /// GPU config derived from the node's GPU label
    pub fn node_gpu_config(&self, node: &ClusterNode) -> Option<GpuConfig> {
        node.gpu_type().map(|gpu_type| GpuConfig {
            label: GPU_LABEL.to_string(),
            gpu_type: gpu_type.to_string(),
            extended_resource_name: GPU_RESOURCE_NAME.to_string(),
        })
    }

    /// Provider ids of a group's live servers
    pub async fn node_group_instances(&self, id: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.registry.instances(id).await?)
    }

    /// Raise a group's target size under the cluster-wide lock
    pub async fn increase_size(&self, id: &str, delta: usize) -> Result<usize, ProviderError> {
        Ok(self.group(id)?.increase_size(delta).await?)
    }

    /// Lower a group's target size under the cluster-wide lock
    pub async fn decrease_target_size(&self, id: &str, delta: usize) -> Result<usize, ProviderError> {
        Ok(self.group(id)?.decrease_target_size(delta).await?)
    }

    /// Called before every control loop iteration.
    ///
    /// Target sizes drop to zero until the next inventory read; inventory
    /// problems surface from that read, never from here.
    pub async fn refresh(&self) {
        self.registry.refresh().await;
    }

    /// Re-read a group's target size from the live server count
    pub async fn target_size_from_inventory(&self, id: &str) -> Result<usize, ProviderError> {
        Ok(self.registry.resync(id).await?)
    }

    /// Re-read every group's target size from the live server counts
    pub async fn resync_all(&self) -> Result<(), ProviderError> {
        Ok(self.registry.resync_all().await?)
    }

    pub fn cleanup(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn group(&self, id: &str) -> Result<Arc<NodeGroup>, ProviderError> {
        self.registry
            .get(id)
            .ok_or_else(|| RegistryError::NodeGroupNotFound(id.to_string()).into())
    }
}
