use std::sync::Mutex;

use arcade_shared::types::DataSourceSpec;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::RETRY_AFTER, Client as ReqwestClient, StatusCode};
use tracing::debug;

use crate::errors::{FeedError, ParseError};
use crate::feed::{EntryParser, EntryRef, Feed, RecordOutcome};

/// Feed over a single HTTP document, such as a TLE catalog.
///
/// The document offers no revision header we can rely on, so listing
/// downloads it and uses the content hash as marker. The body is kept until
/// the matching fetch so it is downloaded once per run.
pub struct HttpFeed<P> {
    source: DataSourceSpec,
    url: String,
    entry_key: String,
    parser: P,
    client: ReqwestClient,
    cached: Mutex<Option<(String, Bytes)>>,
}

impl<P: EntryParser> HttpFeed<P> {
    pub fn new(source: DataSourceSpec, url: &str, entry_key: &str, parser: P) -> Self {
        Self {
            source,
            url: url.to_string(),
            entry_key: entry_key.to_string(),
            parser,
            client: ReqwestClient::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn download(&self) -> Result<Bytes, FeedError> {
        let response = self.client.get(&self.url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse().ok());
                Err(FeedError::RateLimited { retry_after })
            }
            status => Err(FeedError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            }),
        }
    }

    fn take_cached(&self, marker: &str) -> Option<Bytes> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        match cached.take() {
            Some((cached_marker, bytes)) if cached_marker == marker => Some(bytes),
            _ => None,
        }
    }
}

#[async_trait]
impl<P: EntryParser> Feed for HttpFeed<P> {
    fn data_source(&self) -> &DataSourceSpec {
        &self.source
    }

    fn bucket_name(&self) -> Option<&str> {
        None
    }

    async fn list_entries(&self) -> Result<Vec<EntryRef>, FeedError> {
        let bytes = self.download().await?;
        let marker = cos::content_hash(&bytes);
        debug!(url = %self.url, marker = %marker, size = bytes.len(), "Downloaded feed document");

        *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = Some((marker.clone(), bytes));
        Ok(vec![EntryRef {
            key: self.entry_key.clone(),
            marker,
        }])
    }

    async fn fetch_entry(&self, entry: &EntryRef) -> Result<Bytes, FeedError> {
        if let Some(bytes) = self.take_cached(&entry.marker) {
            return Ok(bytes);
        }
        // the document changed since listing; the new content is imported
        // under its own marker on the next run
        let bytes = self.download().await?;
        if cos::content_hash(&bytes) != entry.marker {
            return Err(FeedError::DocumentChanged(self.url.clone()));
        }
        Ok(bytes)
    }

    fn parse_entry(&self, entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError> {
        self.parser.parse(entry_key, raw)
    }
}
