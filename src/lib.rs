//! Node group management core of the Hetzner Cloud autoscaler backend.
//!
//! - [`config`]: node group declarations and the per-group cluster config
//! - [`inventory`]: the provider inventory collaborator
//! - [`cluster`]: the registry, placement checks, node resolution and the scaling lock
//! - [`provider`]: the facade the autoscaling control loop calls

pub mod cli;
pub mod cluster;
pub mod config;
pub mod inventory;
pub mod provider;
