use std::time::Duration;

use arcade_shared::types::ImportProgress;
use chrono::{DateTime, Utc};

use super::InMemoryGraph;
use crate::errors::RepositoryError;
use crate::interfaces::{lease_expiry, WatermarkRepository};

/// Current owner of a source's run lock.
pub(super) struct SourceLease {
    holder: String,
    expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl WatermarkRepository for InMemoryGraph {
    async fn load_progress(&self, source: &str) -> Result<Vec<ImportProgress>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .progress
            .values()
            .filter(|progress| progress.source == source)
            .cloned()
            .collect())
    }

    async fn save_progress(&self, progress: &ImportProgress) -> Result<(), RepositoryError> {
        self.write()?.progress.insert(
            (progress.source.clone(), progress.entry.clone()),
            progress.clone(),
        );
        Ok(())
    }

    async fn try_lock_source(
        &self,
        source: &str,
        holder: &str,
        lease: Duration,
    ) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let expires_at = lease_expiry(now, lease)?;
        let mut state = self.write()?;
        if let Some(current) = state.run_locks.get(source) {
            if current.holder != holder && current.expires_at > now {
                return Ok(false);
            }
        }
        state.run_locks.insert(
            source.to_string(),
            SourceLease {
                holder: holder.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn release_source(&self, source: &str, holder: &str) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state
            .run_locks
            .get(source)
            .is_some_and(|current| current.holder == holder)
        {
            state.run_locks.remove(source);
        }
        Ok(())
    }
}
