//! Per-source run locks.
use std::sync::Arc;
use std::time::Duration;

use arcade_repository::WatermarkRepository;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ImportError;

/// Lease of a run lock unless configured otherwise.
pub const DEFAULT_RUN_LEASE: Duration = Duration::from_secs(300);

/// Guarantees at most one concurrent run per data source across every
/// process that shares the watermark store.
///
/// A lock is a lease kept in the store. A running import renews it while it
/// makes progress, so a crashed process blocks its source for at most one
/// lease.
#[derive(Clone)]
pub struct RunLocks {
    store: Arc<dyn WatermarkRepository>,
    lease: Duration,
}

/// A held run lock. Hand it back with [`RunLocks::release`].
#[derive(Debug)]
pub struct RunLease {
    source: String,
    holder: String,
    renewed_at: Instant,
}

impl RunLease {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl RunLocks {
    pub fn new(store: Arc<dyn WatermarkRepository>) -> Self {
        Self {
            store,
            lease: DEFAULT_RUN_LEASE,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Takes the lock of `source` without waiting.
    ///
    /// Every acquisition gets a fresh holder id, so two runs in one process
    /// exclude each other the same way two processes do.
    pub async fn try_acquire(&self, source: &str) -> Result<RunLease, ImportError> {
        let holder = Uuid::new_v4().to_string();
        let renewed_at = Instant::now();
        if !self.store.try_lock_source(source, &holder, self.lease).await? {
            return Err(ImportError::AlreadyRunning(source.to_string()));
        }
        debug!(source, holder = %holder, "Run lock acquired");
        Ok(RunLease {
            source: source.to_string(),
            holder,
            renewed_at,
        })
    }

    /// Extends `lease` once half of it has elapsed.
    ///
    /// Fails with [`ImportError::LockLost`] when the lease ran out and
    /// another run took the lock over.
    pub async fn keep_alive(&self, lease: &mut RunLease) -> Result<(), ImportError> {
        if lease.renewed_at.elapsed() < self.lease / 2 {
            return Ok(());
        }
        let renewed_at = Instant::now();
        if !self
            .store
            .try_lock_source(&lease.source, &lease.holder, self.lease)
            .await?
        {
            return Err(ImportError::LockLost(lease.source.clone()));
        }
        lease.renewed_at = renewed_at;
        Ok(())
    }

    /// Gives the lock back. A failed release is logged; the lock then frees
    /// itself when the lease runs out.
    pub async fn release(&self, lease: RunLease) {
        match self.store.release_source(&lease.source, &lease.holder).await {
            Ok(()) => debug!(source = %lease.source, "Run lock released"),
            Err(e) => warn!(source = %lease.source, error = %e, "Failed to release run lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_repository::InMemoryGraph;

    #[tokio::test]
    async fn test_second_acquire_fails_until_release() {
        let locks = RunLocks::new(Arc::new(InMemoryGraph::new()));
        let lease = locks.try_acquire("UT - OEM").await.unwrap();

        assert!(matches!(
            locks.clone().try_acquire("UT - OEM").await,
            Err(ImportError::AlreadyRunning(source)) if source == "UT - OEM"
        ));
        assert!(locks.try_acquire("Starlink - OEM").await.is_ok());

        locks.release(lease).await;
        assert!(locks.try_acquire("UT - OEM").await.is_ok());
    }

    #[tokio::test]
    async fn test_handles_over_one_store_exclude_each_other() {
        let store = Arc::new(InMemoryGraph::new());
        let first = RunLocks::new(store.clone());
        let second = RunLocks::new(store);

        let lease = first.try_acquire("CelesTrak - TLE").await.unwrap();
        assert!(matches!(
            second.try_acquire("CelesTrak - TLE").await,
            Err(ImportError::AlreadyRunning(_))
        ));

        first.release(lease).await;
        assert!(second.try_acquire("CelesTrak - TLE").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_lease_is_taken_over_and_lost() {
        let store = Arc::new(InMemoryGraph::new());
        let stale = RunLocks::new(store.clone()).with_lease(Duration::ZERO);
        let fresh = RunLocks::new(store);

        let mut lost = stale.try_acquire("UT - OEM").await.unwrap();
        let held = fresh.try_acquire("UT - OEM").await.unwrap();
        assert_ne!(lost.holder(), held.holder());

        assert!(matches!(
            stale.keep_alive(&mut lost).await,
            Err(ImportError::LockLost(source)) if source == "UT - OEM"
        ));

        // releasing a lost lease leaves the new holder in place
        stale.release(lost).await;
        assert!(matches!(
            fresh.try_acquire("UT - OEM").await,
            Err(ImportError::AlreadyRunning(_))
        ));
    }
}
