//! Resource limits and GPU descriptors handed to the control loop

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extended resource name GPU nodes advertise
pub const GPU_RESOURCE_NAME: &str = "nvidia.com/gpu";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LimitError {
    #[error("expected format `<resource>=<min>:<max>` got {0}")]
    InvalidFormat(String),

    #[error("invalid bound {0} for resource {1}, expected integer")]
    InvalidBound(String, String),

    #[error("max {max} is smaller than min {min} for resource {resource}")]
    InvalidRange { resource: String, min: i64, max: i64 },
}

/// Cluster-wide min/max per resource (cores, memory, nodes, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimiter {
    #[serde(rename = "minLimits")]
    #[serde(default)]
    pub min_limits: HashMap<String, i64>,

    #[serde(rename = "maxLimits")]
    #[serde(default)]
    pub max_limits: HashMap<String, i64>,
}

impl ResourceLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both bounds for a resource
    pub fn with_limit(mut self, resource: impl Into<String>, min: i64, max: i64) -> Self {
        let resource = resource.into();
        self.min_limits.insert(resource.clone(), min);
        self.max_limits.insert(resource, max);
        self
    }

    /// Lower bound, 0 when unset
    pub fn min(&self, resource: &str) -> i64 {
        self.min_limits.get(resource).copied().unwrap_or(0)
    }

    /// Upper bound, `i64::MAX` when unset
    pub fn max(&self, resource: &str) -> i64 {
        self.max_limits.get(resource).copied().unwrap_or(i64::MAX)
    }

    /// Resources with at least one bound set, sorted
    pub fn resources(&self) -> Vec<&str> {
        let mut resources: Vec<&str> = self
            .min_limits
            .keys()
            .chain(self.max_limits.keys())
            .map(String::as_str)
            .collect();
        resources.sort_unstable();
        resources.dedup();
        resources
    }
}

/// Parse a `<resource>=<min>:<max>` flag value
pub fn parse_resource_limit(value: &str) -> Result<(String, i64, i64), LimitError> {
    let (resource, range) = value
        .split_once('=')
        .ok_or_else(|| LimitError::InvalidFormat(value.to_string()))?;
    let (min, max) = range
        .split_once(':')
        .ok_or_else(|| LimitError::InvalidFormat(value.to_string()))?;
    if resource.is_empty() {
        return Err(LimitError::InvalidFormat(value.to_string()));
    }

    let parse = |bound: &str| {
        bound
            .parse::<i64>()
            .map_err(|_| LimitError::InvalidBound(bound.to_string(), resource.to_string()))
    };
    let (min, max) = (parse(min)?, parse(max)?);
    if max < min {
        return Err(LimitError::InvalidRange {
            resource: resource.to_string(),
            min,
            max,
        });
    }

    Ok((resource.to_string(), min, max))
}

/// GPU attached to a node, as far as the labels tell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpuConfig {
    pub label: String,
    pub gpu_type: String,
    pub extended_resource_name: String,
}
