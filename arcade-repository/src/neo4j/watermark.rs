use std::time::Duration;

use arcade_shared::types::ImportProgress;
use chrono::Utc;
use neo4rs::Query;

use super::rows::{self, timestamp};
use super::{txn_fetch_all, Neo4jGraph};
use crate::errors::RepositoryError;
use crate::interfaces::{lease_expiry, WatermarkRepository};

#[async_trait::async_trait]
impl WatermarkRepository for Neo4jGraph {
    async fn load_progress(&self, source: &str) -> Result<Vec<ImportProgress>, RepositoryError> {
        let query = Query::new(
            "MATCH (p:ImportProgress {source: $source})
             RETURN p.source AS source, p.entry AS entry, p.marker AS marker,
                    p.committed_records AS committed_records, p.complete AS complete,
                    p.updated_at AS updated_at
             ORDER BY entry"
                .to_string(),
        )
        .param("source", source.to_string());
        self.fetch_all(query).await?.iter().map(rows::import_progress).collect()
    }

    async fn save_progress(&self, progress: &ImportProgress) -> Result<(), RepositoryError> {
        let committed = i64::try_from(progress.committed_records).map_err(|_| {
            RepositoryError::InvalidData(format!(
                "committed records out of range: {}",
                progress.committed_records
            ))
        })?;
        let query = Query::new(
            "MERGE (p:ImportProgress {source: $source, entry: $entry})
             SET p.marker = $marker, p.committed_records = $committed_records,
                 p.complete = $complete, p.updated_at = $updated_at"
                .to_string(),
        )
        .param("source", progress.source.clone())
        .param("entry", progress.entry.clone())
        .param("marker", progress.marker.clone())
        .param("committed_records", committed)
        .param("complete", progress.complete)
        .param("updated_at", timestamp(&progress.updated_at));
        self.graph.run(query).await?;
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

        let mut txn = self.graph.start_txn().await?;
        // The write takes the lock node's write lock, so the holder read
        // below sees every competing claim that committed first.
        txn.run(
            Query::new(
                "MERGE (l:ImportLock {source: $source}) SET l.claimed_at = $now".to_string(),
            )
            .param("source", source.to_string())
            .param("now", timestamp(&now)),
        )
        .await?;
        let rows = txn_fetch_all(
            &mut txn,
            Query::new(
                "MATCH (l:ImportLock {source: $source})
                 WITH l, (l.holder IS NULL OR l.holder = $holder OR l.expires_at <= $now) AS free
                 FOREACH (_ IN CASE WHEN free THEN [1] ELSE [] END |
                     SET l.holder = $holder, l.expires_at = $expires_at)
                 RETURN free AS acquired"
                    .to_string(),
            )
            .param("source", source.to_string())
            .param("holder", holder.to_string())
            .param("now", timestamp(&now))
            .param("expires_at", timestamp(&expires_at)),
        )
        .await?;
        txn.commit().await?;

        match rows.first() {
            Some(row) => Ok(row.get::<bool>("acquired")?),
            None => Ok(false),
        }
    }

    async fn release_source(&self, source: &str, holder: &str) -> Result<(), RepositoryError> {
        let query = Query::new(
            "MATCH (l:ImportLock {source: $source, holder: $holder})
             REMOVE l.holder, l.expires_at"
                .to_string(),
        )
        .param("source", source.to_string())
        .param("holder", holder.to_string());
        self.graph.run(query).await?;
        Ok(())
    }
}
