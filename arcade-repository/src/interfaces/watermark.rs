use std::time::Duration;

use arcade_shared::types::ImportProgress;
use chrono::{DateTime, Utc};

use crate::errors::RepositoryError;

/// Trait for interacting with the importer watermark store.
///
/// Progress is kept per source and entry, so a feed that lists many entries
/// resumes each one independently. The store also holds the per-source run
/// locks, so every process sharing it sees the same locks.
#[async_trait::async_trait]
pub trait WatermarkRepository: Send + Sync {
    async fn load_progress(&self, source: &str) -> Result<Vec<ImportProgress>, RepositoryError>;
    async fn save_progress(&self, progress: &ImportProgress) -> Result<(), RepositoryError>;

    /// Claims the run lock of `source` for `holder` until `lease` elapses.
    ///
    /// Returns `false` while another holder's lease is live. Claiming a lock
    /// that `holder` already owns extends its lease.
    async fn try_lock_source(
        &self,
        source: &str,
        holder: &str,
        lease: Duration,
    ) -> Result<bool, RepositoryError>;

    /// Releases the run lock of `source` if `holder` still owns it.
    async fn release_source(&self, source: &str, holder: &str) -> Result<(), RepositoryError>;
}

/// The instant a lease taken at `now` runs out.
pub(crate) fn lease_expiry(
    now: DateTime<Utc>,
    lease: Duration,
) -> Result<DateTime<Utc>, RepositoryError> {
    chrono::Duration::from_std(lease)
        .ok()
        .and_then(|lease| now.checked_add_signed(lease))
        .ok_or_else(|| RepositoryError::InvalidData(format!("lease out of range: {:?}", lease)))
}
