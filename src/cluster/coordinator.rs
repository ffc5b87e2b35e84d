//! Cluster-wide serialization of node group size changes
//!
//! Every group of one registry shares the same lock. Size changes to
//! different groups still go through one rate-limited provider project, so
//! they are serialized across the whole cluster rather than per group.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Shared exclusion handle, cloned into every node group
#[derive(Debug, Clone, Default)]
pub struct ScalingCoordinator {
    lock: Arc<Mutex<()>>,
}

impl ScalingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access. Hold the guard for the whole critical section.
    ///
    /// Waiters are served in FIFO order. The lock is not reentrant: acquiring
    /// it again while holding the guard deadlocks.
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Take exclusive access only if nobody holds it
    #[cfg(test)]
    pub(crate) fn try_exclusive(&self) -> Option<MutexGuard<'_, ()>> {
        self.lock.try_lock().ok()
    }

    /// Whether two handles guard the same lock
    #[cfg(test)]
    pub(crate) fn shares_lock_with(&self, other: &ScalingCoordinator) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_lock() {
        let coordinator = ScalingCoordinator::new();
        let clone = coordinator.clone();
        assert!(coordinator.shares_lock_with(&clone));
        assert!(!coordinator.shares_lock_with(&ScalingCoordinator::new()));

        let _guard = coordinator.exclusive().await;
        assert!(clone.try_exclusive().is_none());
    }

    #[tokio::test]
    async fn test_released_on_drop() {
        let coordinator = ScalingCoordinator::new();
        {
            let _guard = coordinator.exclusive().await;
        }
        assert!(coordinator.try_exclusive().is_some());
    }
}
