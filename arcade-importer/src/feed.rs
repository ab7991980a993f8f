//! The feed abstraction consumed by the importer engine.
use arcade_shared::types::{CatalogId, DataPayload, DataSourceSpec};
use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::{FeedError, ParseError};

/// One listed entry of a feed.
///
/// `marker` identifies the entry revision (content hash, etag, size and
/// modification time). Feeds offer no "changed since" query, so comparing
/// markers against stored progress is how unchanged entries are recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRef {
    pub key: String,
    pub marker: String,
}

/// A parsed record, ready to be merged into the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub dedup_key: String,
    /// Catalog identifiers of the observed object; the first one is primary.
    pub identifiers: Vec<CatalogId>,
    pub name: Option<String>,
    pub payload: DataPayload,
}

/// Outcome of decoding one record of an entry.
pub type RecordOutcome = Result<Observation, ParseError>;

/// Turns the raw bytes of an entry into records.
///
/// `Err` means the entry cannot be decoded as a whole (corrupt archive,
/// unreadable encoding). Individual bad records are returned as `Err` items
/// of the vector so the remaining records are still imported.
pub trait EntryParser: Send + Sync {
    fn parse(&self, entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError>;
}

/// An external, read-only feed.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Registration of the data source this feed provides.
    fn data_source(&self) -> &DataSourceSpec;

    /// Bucket the entries already live in. `None` means the fetched bytes
    /// must be archived before they are referenced.
    fn bucket_name(&self) -> Option<&str>;

    async fn list_entries(&self) -> Result<Vec<EntryRef>, FeedError>;

    async fn fetch_entry(&self, entry: &EntryRef) -> Result<Bytes, FeedError>;

    fn parse_entry(&self, entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError>;
}
