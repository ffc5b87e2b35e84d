//! Node group - a declared, size-bounded pool of identical servers

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::debug;

use super::coordinator::ScalingCoordinator;
use super::placement::PlacementGroup;
use crate::config::NodeGroupSpec;

/// Errors for rejected size changes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScalingError {
    #[error("delta must be positive, have: {0}")]
    ZeroDelta(usize),

    #[error("size increase for '{group}' is too large. current: {current} delta: {delta} max: {max}")]
    AboveMax {
        group: String,
        current: usize,
        delta: usize,
        max: usize,
    },

    #[error("size decrease for '{group}' is too large. current: {current} delta: {delta} min: {min}")]
    BelowMin {
        group: String,
        current: usize,
        delta: usize,
        min: usize,
    },
}

/// Live state of one node group
#[derive(Debug)]
pub struct NodeGroup {
    id: String,
    min_size: usize,
    max_size: usize,
    instance_type: String,
    region: String,
    placement_group: Option<PlacementGroup>,

    /// Written only while holding the coordinator's lock; read freely
    target_size: AtomicUsize,
    coordinator: ScalingCoordinator,
}

impl NodeGroup {
    /// Create a group from its declaration and the current server count
    pub fn new(spec: &NodeGroupSpec, target_size: usize, coordinator: ScalingCoordinator) -> Self {
        Self {
            id: spec.name.clone(),
            min_size: spec.min_size,
            max_size: spec.max_size,
            instance_type: spec.instance_type.to_lowercase(),
            region: spec.region.to_lowercase(),
            placement_group: None,
            target_size: AtomicUsize::new(target_size),
            coordinator,
        }
    }

    /// Attach the resolved placement group
    pub fn with_placement_group(mut self, placement_group: PlacementGroup) -> Self {
        self.placement_group = Some(placement_group);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn placement_group(&self) -> Option<&PlacementGroup> {
        self.placement_group.as_ref()
    }

    pub fn coordinator(&self) -> &ScalingCoordinator {
        &self.coordinator
    }

    /// Snapshot of the target size; may be stale while a size change is in flight
    pub fn target_size(&self) -> usize {
        self.target_size.load(Ordering::Acquire)
    }

    /// Raise the target size by `delta`, up to `max_size`.
    ///
    /// Returns the new target size.
    pub async fn increase_size(&self, delta: usize) -> Result<usize, ScalingError> {
        if delta == 0 {
            return Err(ScalingError::ZeroDelta(delta));
        }

        let _guard = self.coordinator.exclusive().await;
        let current = self.target_size.load(Ordering::Acquire);
        let desired = current
            .checked_add(delta)
            .filter(|desired| *desired <= self.max_size)
            .ok_or_else(|| ScalingError::AboveMax {
                group: self.id.clone(),
                current,
                delta,
                max: self.max_size,
            })?;

        self.target_size.store(desired, Ordering::Release);
        debug!(group = %self.id, current, desired, "increased target size");
        Ok(desired)
    }

    /// Lower the target size by `delta`, down to `min_size`.
    ///
    /// Returns the new target size.
    pub async fn decrease_target_size(&self, delta: usize) -> Result<usize, ScalingError> {
        if delta == 0 {
            return Err(ScalingError::ZeroDelta(delta));
        }

        let _guard = self.coordinator.exclusive().await;
        let current = self.target_size.load(Ordering::Acquire);
        let desired = current
            .checked_sub(delta)
            .filter(|desired| *desired >= self.min_size)
            .ok_or_else(|| ScalingError::BelowMin {
                group: self.id.clone(),
                current,
                delta,
                min: self.min_size,
            })?;

        self.target_size.store(desired, Ordering::Release);
        debug!(group = %self.id, current, desired, "decreased target size");
        Ok(desired)
    }

    /// Overwrite the target size, bypassing the bounds checks
    pub async fn reset_target_size(&self, size: usize) {
        let _guard = self.coordinator.exclusive().await;
        self.target_size.store(size, Ordering::Release);
    }

    /// Replace the target size with the value produced by `read`.
    ///
    /// The lock is held from before `read` starts until the new size is
    /// stored, so no size change can land in between and be overwritten.
    /// `read` must not take the coordinator lock itself.
    pub async fn reseed_with<F, Fut, E>(&self, read: F) -> Result<usize, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<usize, E>>,
    {
        let _guard = self.coordinator.exclusive().await;
        let size = read().await?;
        self.target_size.store(size, Ordering::Release);
        debug!(group = %self.id, size, "reseeded target size");
        Ok(size)
    }
}

impl fmt::Display for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cluster ID: {} (min:{} max:{} target:{} type:{} region:{})",
            self.id,
            self.min_size,
            self.max_size,
            self.target_size(),
            self.instance_type,
            self.region
        )?;
        if let Some(ref placement) = self.placement_group {
            write!(f, " placement group: {}", placement.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn spec(min: usize, max: usize) -> NodeGroupSpec {
        NodeGroupSpec {
            name: "pool-a".to_string(),
            min_size: min,
            max_size: max,
            instance_type: "CPX31".to_string(),
            region: "FSN1".to_string(),
        }
    }

    #[test]
    fn test_new_lowercases_type_and_region() {
        let group = NodeGroup::new(&spec(1, 3), 2, ScalingCoordinator::new());
        assert_eq!(group.id(), "pool-a");
        assert_eq!(group.instance_type(), "cpx31");
        assert_eq!(group.region(), "fsn1");
        assert_eq!(group.target_size(), 2);
        assert!(group.placement_group().is_none());
    }

    #[tokio::test]
    async fn test_increase_size() {
        let group = NodeGroup::new(&spec(0, 5), 2, ScalingCoordinator::new());
        assert_eq!(group.increase_size(3).await, Ok(5));
        assert_eq!(group.target_size(), 5);
    }

    #[tokio::test]
    async fn test_increase_above_max_rejected() {
        let group = NodeGroup::new(&spec(0, 5), 4, ScalingCoordinator::new());
        let result = group.increase_size(2).await;
        assert!(matches!(result, Err(ScalingError::AboveMax { current: 4, delta: 2, max: 5, .. })));
        assert_eq!(group.target_size(), 4);

        assert!(group.increase_size(usize::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_delta_rejected() {
        let group = NodeGroup::new(&spec(0, 5), 1, ScalingCoordinator::new());
        assert_eq!(group.increase_size(0).await, Err(ScalingError::ZeroDelta(0)));
        assert_eq!(group.decrease_target_size(0).await, Err(ScalingError::ZeroDelta(0)));
    }

    #[tokio::test]
    async fn test_decrease_target_size() {
        let group = NodeGroup::new(&spec(1, 5), 4, ScalingCoordinator::new());
        assert_eq!(group.decrease_target_size(2).await, Ok(2));

        let result = group.decrease_target_size(2).await;
        assert!(matches!(result, Err(ScalingError::BelowMin { current: 2, min: 1, .. })));

        let result = group.decrease_target_size(5).await;
        assert!(matches!(result, Err(ScalingError::BelowMin { .. })));
        assert_eq!(group.target_size(), 2);
    }

    #[tokio::test]
    async fn test_reset_ignores_bounds() {
        let group = NodeGroup::new(&spec(2, 5), 3, ScalingCoordinator::new());
        group.reset_target_size(0).await;
        assert_eq!(group.target_size(), 0);
    }

    #[tokio::test]
    async fn test_reseed_with() {
        let group = NodeGroup::new(&spec(0, 5), 4, ScalingCoordinator::new());
        assert_eq!(group.reseed_with(|| async { Ok::<_, ()>(2) }).await, Ok(2));
        assert_eq!(group.target_size(), 2);

        assert_eq!(group.reseed_with(|| async { Err::<usize, _>("down") }).await, Err("down"));
        assert_eq!(group.target_size(), 2);
    }

    #[tokio::test]
    async fn test_size_change_waits_for_reseed() {
        let group = Arc::new(NodeGroup::new(&spec(0, 9), 0, ScalingCoordinator::new()));

        let reseed = tokio::spawn({
            let group = group.clone();
            async move {
                group
                    .reseed_with(|| async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, ()>(1)
                    })
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(group.increase_size(3).await, Ok(4));
        assert_eq!(reseed.await.unwrap(), Ok(1));
        assert_eq!(group.target_size(), 4);
    }

    #[tokio::test]
    async fn test_size_change_waits_for_coordinator() {
        let coordinator = ScalingCoordinator::new();
        let group = Arc::new(NodeGroup::new(&spec(0, 5), 0, coordinator.clone()));

        let guard = coordinator.exclusive().await;
        let pending = tokio::spawn({
            let group = group.clone();
            async move { group.increase_size(1).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());
        assert_eq!(group.target_size(), 0);

        drop(guard);
        assert_eq!(pending.await.unwrap(), Ok(1));
    }

    #[test]
    fn test_display() {
        let group = NodeGroup::new(&spec(1, 3), 2, ScalingCoordinator::new())
            .with_placement_group(PlacementGroup::new(9, "spread"));
        let text = group.to_string();
        assert!(text.contains("pool-a"));
        assert!(text.contains("min:1 max:3 target:2"));
        assert!(text.contains("placement group: 9"));
    }
}
