use std::sync::Arc;

use arcade_shared::types::DataSourceSpec;
use async_trait::async_trait;
use bytes::Bytes;
use cos::Bucket;
use regex::Regex;

use crate::errors::{FeedError, ParseError};
use crate::feed::{EntryParser, EntryRef, Feed, RecordOutcome};

/// Feed over the objects of a bucket whose keys match `pattern`.
///
/// The bucket listing version is the entry marker, and the artifacts are
/// referenced where they are instead of being copied to the archive.
pub struct BucketFeed<P> {
    source: DataSourceSpec,
    bucket: Arc<dyn Bucket>,
    pattern: Regex,
    parser: P,
}

impl<P: EntryParser> BucketFeed<P> {
    pub fn new(
        source: DataSourceSpec,
        bucket: Arc<dyn Bucket>,
        pattern: &str,
        parser: P,
    ) -> Result<Self, FeedError> {
        Ok(Self {
            source,
            bucket,
            pattern: Regex::new(pattern)?,
            parser,
        })
    }
}

#[async_trait]
impl<P: EntryParser> Feed for BucketFeed<P> {
    fn data_source(&self) -> &DataSourceSpec {
        &self.source
    }

    fn bucket_name(&self) -> Option<&str> {
        Some(self.bucket.name())
    }

    async fn list_entries(&self) -> Result<Vec<EntryRef>, FeedError> {
        let objects = self.bucket.list_objects().await?;
        Ok(objects
            .into_iter()
            .filter(|object| self.pattern.is_match(&object.key))
            .map(|object| EntryRef {
                key: object.key,
                marker: object.version,
            })
            .collect())
    }

    async fn fetch_entry(&self, entry: &EntryRef) -> Result<Bytes, FeedError> {
        Ok(self.bucket.download(&entry.key).await?)
    }

    fn parse_entry(&self, entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError> {
        self.parser.parse(entry_key, raw)
    }
}
