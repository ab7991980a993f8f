//! The importer engine: drives a [`Feed`] into the provenance graph.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arcade_graph::{GraphError, ProvenanceGraph};
use arcade_repository::WatermarkRepository;
use arcade_shared::types::{
    CosObjectId, DataSourceId, ImportProgress, NewCosObject, NewDataNode, Provenance,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use cos::ObjectStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{FeedError, ImportError};
use crate::feed::{EntryRef, Feed, Observation};
use crate::locks::{RunLease, RunLocks};

/// Why a run stopped before reaching the end of its feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TruncationReason {
    RateLimited,
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TruncationReason::RateLimited => "rate limited",
            TruncationReason::Cancelled => "cancelled",
            TruncationReason::DeadlineExceeded => "deadline exceeded",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Progress up to the interruption is saved; the next run resumes there.
    Truncated(TruncationReason),
}

/// A record, or a whole entry when `record` is `None`, that was not imported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRecord {
    pub entry: String,
    pub record: Option<usize>,
    pub reason: String,
}

/// Summary of one importer run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportResult {
    pub source: String,
    pub entries_seen: usize,
    pub entries_processed: usize,
    /// Records read during this run, resumed offsets excluded.
    pub fetched: usize,
    pub created: usize,
    pub deduplicated: usize,
    pub skipped: Vec<SkippedRecord>,
    pub status: RunStatus,
}

impl ImportResult {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            entries_seen: 0,
            entries_processed: 0,
            fetched: 0,
            created: 0,
            deduplicated: 0,
            skipped: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    fn skip(&mut self, entry: &str, record: Option<usize>, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(source = %self.source, entry, record, reason = %reason, "Skipped record");
        self.skipped.push(SkippedRecord {
            entry: entry.to_string(),
            record,
            reason,
        });
    }
}

/// Cancellation and deadline of a run.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The reason the run must stop now, if any.
    pub fn interruption(&self) -> Option<TruncationReason> {
        if self.cancel.is_cancelled() {
            return Some(TruncationReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(TruncationReason::DeadlineExceeded)
            }
            _ => None,
        }
    }
}

/// A unit of work over one external feed.
#[async_trait]
pub trait Importer: Send + Sync {
    fn source_name(&self) -> &str;

    async fn run(&self, ctx: &RunContext) -> Result<ImportResult, ImportError>;
}

/// Imports a [`Feed`] entry by entry, record by record.
///
/// Re-running over an unchanged feed writes nothing: complete entries are
/// skipped by marker, and every data node carries the ingest key
/// `entry@marker#index` so that a replayed record resolves to the node it
/// already produced.
pub struct FeedImporter<F> {
    feed: F,
    graph: ProvenanceGraph,
    watermarks: Arc<dyn WatermarkRepository>,
    archive: Arc<dyn ObjectStore>,
    locks: RunLocks,
}

impl<F: Feed> FeedImporter<F> {
    pub fn new(
        feed: F,
        graph: ProvenanceGraph,
        watermarks: Arc<dyn WatermarkRepository>,
        archive: Arc<dyn ObjectStore>,
        locks: RunLocks,
    ) -> Self {
        Self {
            feed,
            graph,
            watermarks,
            archive,
            locks,
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Records the raw entry as a COS object and returns its id.
    ///
    /// Bucket entries are referenced where they are. Anything else is put into
    /// the archive first; the archive does not rewrite identical content.
    async fn archive_entry(
        &self,
        entry: &EntryRef,
        raw: &Bytes,
    ) -> Result<CosObjectId, ImportError> {
        let object = match self.feed.bucket_name() {
            Some(bucket) => NewCosObject {
                bucket: bucket.to_string(),
                key: entry.key.clone(),
                content_hash: cos::content_hash(raw),
                size: raw.len() as u64,
            },
            None => {
                let stored = self.archive.put(&entry.key, raw.clone()).await?;
                NewCosObject {
                    bucket: stored.bucket,
                    key: stored.key,
                    content_hash: stored.content_hash,
                    size: stored.size,
                }
            }
        };
        Ok(self.graph.record_artifact(&object).await?.value.id)
    }

    /// Merges one observation. Returns `true` when a data node was written.
    async fn ingest(
        &self,
        source: DataSourceId,
        entry: &EntryRef,
        index: usize,
        artifact: CosObjectId,
        observation: Observation,
    ) -> Result<bool, GraphError> {
        let space_object = self
            .graph
            .upsert_space_object(&observation.identifiers, observation.name.as_deref())
            .await?
            .value;

        let node = NewDataNode::new(
            Provenance {
                space_object: space_object.id,
                data_source: source,
            },
            observation.dedup_key,
            observation.payload,
        )?
        .with_artifact(Some(artifact))
        .with_ingest_key(format!("{}@{}#{}", entry.key, entry.marker, index));

        Ok(self.graph.attach_data_node(&node).await?.created)
    }

    async fn save(&self, progress: &mut ImportProgress) -> Result<(), ImportError> {
        progress.updated_at = Utc::now();
        self.watermarks.save_progress(progress).await?;
        Ok(())
    }

    /// Imports one entry. Returns the reason when the run has to stop.
    async fn import_entry(
        &self,
        ctx: &RunContext,
        lease: &mut RunLease,
        source: DataSourceId,
        entry: &EntryRef,
        mut progress: ImportProgress,
        result: &mut ImportResult,
    ) -> Result<Option<TruncationReason>, ImportError> {
        let offset = progress.committed_records;

        let raw = match self.feed.fetch_entry(entry).await {
            Ok(raw) => raw,
            Err(FeedError::RateLimited { retry_after }) => {
                warn!(
                    source = %result.source,
                    entry = %entry.key,
                    retry_after,
                    "Rate limited while fetching entry"
                );
                return Ok(Some(TruncationReason::RateLimited));
            }
            Err(e) => {
                // left incomplete so the next run retries it
                result.skip(&entry.key, None, e);
                return Ok(None);
            }
        };

        let artifact = self.archive_entry(entry, &raw).await?;
        result.entries_processed += 1;

        let records = match self.feed.parse_entry(&entry.key, &raw) {
            Ok(records) => records,
            Err(e) => {
                result.skip(&entry.key, None, e);
                progress.complete = true;
                self.save(&mut progress).await?;
                return Ok(None);
            }
        };
        result.fetched += records.len().saturating_sub(offset);

        for (index, outcome) in records.into_iter().enumerate().skip(offset) {
            if let Some(reason) = ctx.interruption() {
                return Ok(Some(reason));
            }
            self.locks.keep_alive(lease).await?;

            match outcome {
                Ok(observation) => {
                    match self.ingest(source, entry, index, artifact, observation).await {
                        Ok(true) => result.created += 1,
                        Ok(false) => result.deduplicated += 1,
                        Err(e @ GraphError::IdentityConflict { .. }) => {
                            error!(
                                source = %result.source,
                                entry = %entry.key,
                                record = index,
                                error = %e,
                                "Identity conflict, record not imported"
                            );
                            result.skipped.push(SkippedRecord {
                                entry: entry.key.clone(),
                                record: Some(index),
                                reason: e.to_string(),
                            });
                        }
                        Err(e @ GraphError::Validation(_)) => {
                            result.skip(&entry.key, Some(index), e)
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => result.skip(&entry.key, Some(index), e),
            }

            progress.committed_records = index + 1;
            self.save(&mut progress).await?;
        }

        progress.complete = true;
        self.save(&mut progress).await?;
        debug!(source = %result.source, entry = %entry.key, "Entry imported");
        Ok(None)
    }

    async fn run_locked(
        &self,
        ctx: &RunContext,
        lease: &mut RunLease,
    ) -> Result<ImportResult, ImportError> {
        let source_name = self.source_name();
        let mut result = ImportResult::new(source_name);

        let source = self
            .graph
            .register_data_source(self.feed.data_source())
            .await?
            .value;

        let mut stored: HashMap<String, ImportProgress> = self
            .watermarks
            .load_progress(source_name)
            .await?
            .into_iter()
            .map(|progress| (progress.entry.clone(), progress))
            .collect();

        let entries = match self.feed.list_entries().await {
            Ok(entries) => entries,
            Err(FeedError::RateLimited { retry_after }) => {
                warn!(retry_after, "Rate limited while listing entries");
                result.status = RunStatus::Truncated(TruncationReason::RateLimited);
                return Ok(result);
            }
            Err(e) => return Err(e.into()),
        };
        result.entries_seen = entries.len();

        for entry in &entries {
            if let Some(reason) = ctx.interruption() {
                result.status = RunStatus::Truncated(reason);
                break;
            }

            let progress = match stored.remove(&entry.key) {
                Some(progress) if progress.is_done_for(&entry.marker) => continue,
                Some(progress) => progress.resume_for(&entry.marker),
                None => ImportProgress::new(source_name, &entry.key, &entry.marker),
            };
            self.locks.keep_alive(lease).await?;

            if let Some(reason) = self
                .import_entry(ctx, lease, source.id, entry, progress, &mut result)
                .await?
            {
                result.status = RunStatus::Truncated(reason);
                break;
            }
        }

        match result.status {
            RunStatus::Completed => info!(
                entries_seen = result.entries_seen,
                entries_processed = result.entries_processed,
                fetched = result.fetched,
                created = result.created,
                deduplicated = result.deduplicated,
                skipped = result.skipped.len(),
                "Import run completed"
            ),
            RunStatus::Truncated(reason) => warn!(
                %reason,
                entries_processed = result.entries_processed,
                created = result.created,
                skipped = result.skipped.len(),
                "Import run truncated"
            ),
        }
        Ok(result)
    }
}

#[async_trait]
impl<F: Feed> Importer for FeedImporter<F> {
    fn source_name(&self) -> &str {
        &self.feed.data_source().name
    }

    #[instrument(skip(self, ctx), fields(source = %self.source_name()))]
    async fn run(&self, ctx: &RunContext) -> Result<ImportResult, ImportError> {
        let mut lease = self.locks.try_acquire(self.source_name()).await?;
        let outcome = self.run_locked(ctx, &mut lease).await;
        self.locks.release(lease).await;
        outcome
    }
}
