//! # Node group management
//!
//! Owns the mapping between declared node groups and the servers the
//! provider reports, and enforces the placement group limits the provider
//! does not check on its own.
//!
//! ## Architecture
//!
//! ```text
//!   declarations ──► spec parser ──► NodeGroupRegistry::bootstrap
//!                                        │  list_instances / get_placement_group
//!                                        ▼
//!                               placement aggregation
//!                                        │
//!                                        ▼
//!                   ┌──────────── NodeGroupRegistry ────────────┐
//!                   │  group id ─► NodeGroup (target size)      │
//!                   │  one ScalingCoordinator for all groups    │
//!                   └───────────────────────────────────────────┘
//!                          ▲                          ▲
//!                    NodeResolver              size changes
//!              (inventory, then node label)
//! ```

pub mod coordinator;
pub mod node;
pub mod node_group;
pub mod placement;
pub mod registry;
pub mod resolver;

pub use coordinator::ScalingCoordinator;
pub use node::{format_provider_id, parse_provider_id, ClusterNode};
pub use node_group::{NodeGroup, ScalingError};
pub use placement::{oversized_placement_groups, PlacementGroup};
pub use registry::{BootstrapError, BootstrapOptions, NodeGroupRegistry, RegistryError};
pub use resolver::{NodeResolver, Ownership, OwnershipSource, ResolveError};

/// Namespace of every label this provider reads or writes
pub const LABEL_NAMESPACE: &str = "hcloud";

/// Label carrying the owning node group's name, on servers and cluster nodes
pub const NODE_GROUP_LABEL: &str = "hcloud/node-group";

/// Label marking GPU-bearing nodes
pub const GPU_LABEL: &str = "hcloud/gpu-node";

/// Scheme prefix of node provider ids belonging to this provider
pub const PROVIDER_ID_PREFIX: &str = "hcloud://";

/// Largest combined max size allowed in a single placement group
pub const MAX_PLACEMENT_GROUP_SIZE: usize = 10;

/// How long startup waits for a placement group lookup
pub const PLACEMENT_LOOKUP_TIMEOUT_SECS: u64 = 10;
