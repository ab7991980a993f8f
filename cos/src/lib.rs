//! Cloud object storage access for bulk artifacts.
//!
//! This crate provides:
//! - [`ObjectStore`] trait for the immutable archive (`put` / `get`)
//! - [`Bucket`] trait for read-only external buckets that feeds are listed from
//! - [`HttpObjectStore`] production archive client for S3-style gateways
//! - [`FileSystemBucket`] bucket backed by a local directory
//! - [`MockObjectStore`] in-memory store implementing both traits, for tests
//!
//! ## Usage with CosSource
//!
//! ```ignore
//! use cos::CosSource;
//!
//! // Development/testing: keep artifacts in memory
//! let store = CosSource::mock("arcade-archive").into_store();
//!
//! // Production: talk to a gateway
//! let store = CosSource::live("https://cos.example.com", "arcade-archive", None).into_store();
//!
//! let object = store.put("tle/catalog.txt", bytes).await?;
//! let bytes = store.get(&object).await?;
//! ```
//!
//! Objects are immutable. A `put` addresses the object by key *and* content
//! hash, so writing changed content under the same key produces a new object
//! and never overwrites the old one.

mod fs;
mod mock;

pub use fs::FileSystemBucket;
pub use mock::MockObjectStore;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::IF_NONE_MATCH, Client as ReqwestClient, RequestBuilder, StatusCode};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum CosError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected status {status} for {key}")]
    Status { status: u16, key: String },
    #[error("content hash mismatch for {key}: expected {expected}, got {actual}")]
    HashMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, CosError>;

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Rejects keys that would escape the bucket or address nothing.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|part| part == ".." || part.is_empty())
    {
        return Err(CosError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Reference to one immutable object version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
    pub content_hash: String,
    pub size: u64,
}

impl ObjectRef {
    pub fn for_bytes(bucket: &str, key: &str, bytes: &[u8]) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_hash: content_hash(bytes),
            size: bytes.len() as u64,
        }
    }

    /// Physical key of the object version inside the bucket.
    pub fn storage_key(&self) -> String {
        format!("{}@{}", self.key, self.content_hash)
    }
}

/// Listing entry of a bucket.
///
/// `version` changes whenever the object's content may have changed (etag,
/// content hash, or size plus modification time).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub version: String,
}

/// Immutable archive for bulk artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// Stores `bytes` under `key`. Storing identical content twice is a no-op
    /// returning the same reference.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<ObjectRef>;

    async fn get(&self, object: &ObjectRef) -> Result<Bytes>;
}

/// Read-only view of an external bucket that a feed is imported from.
#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    /// Lists every object in the bucket, sorted by key.
    async fn list_objects(&self) -> Result<Vec<ObjectSummary>>;

    async fn download(&self, key: &str) -> Result<Bytes>;
}

/// Archive client for an S3-compatible HTTP gateway.
///
/// Writes use `If-None-Match: *`, so the gateway refuses to replace an
/// existing object; a `412 Precondition Failed` therefore means the identical
/// version is already stored.
pub struct HttpObjectStore {
    endpoint: String,
    bucket: String,
    token: Option<String>,
    client: ReqwestClient,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, bucket: &str) -> Self {
        HttpObjectStore {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            token: None,
            client: ReqwestClient::new(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn object_url(&self, storage_key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, storage_key)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<ObjectRef> {
        validate_key(key)?;
        let object = ObjectRef::for_bytes(&self.bucket, key, &bytes);
        let storage_key = object.storage_key();

        let request = self
            .client
            .put(self.object_url(&storage_key))
            .header(IF_NONE_MATCH, "*")
            .body(bytes);
        let response = self.authorize(request).send().await?;

        match response.status() {
            status if status.is_success() => {
                tracing::debug!(bucket = %self.bucket, key = %storage_key, "Stored object");
                Ok(object)
            }
            StatusCode::PRECONDITION_FAILED => {
                tracing::debug!(bucket = %self.bucket, key = %storage_key, "Object already stored");
                Ok(object)
            }
            status => Err(CosError::Status {
                status: status.as_u16(),
                key: storage_key,
            }),
        }
    }

    async fn get(&self, object: &ObjectRef) -> Result<Bytes> {
        let storage_key = object.storage_key();
        let request = self.client.get(self.object_url(&storage_key));
        let response = self.authorize(request).send().await?;

        match response.status() {
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                let actual = content_hash(&bytes);
                if actual != object.content_hash {
                    return Err(CosError::HashMismatch {
                        key: storage_key,
                        expected: object.content_hash.clone(),
                        actual,
                    });
                }
                Ok(bytes)
            }
            StatusCode::NOT_FOUND => Err(CosError::NotFound(storage_key)),
            status => Err(CosError::Status {
                status: status.as_u16(),
                key: storage_key,
            }),
        }
    }
}

/// Configuration for the archive object store.
#[derive(Debug, Clone)]
pub enum CosSource {
    /// Keep archived artifacts in memory.
    Mock { bucket: String },

    /// Store archived artifacts through an HTTP gateway.
    Live {
        endpoint: String,
        bucket: String,
        token: Option<String>,
    },
}

impl CosSource {
    pub fn mock(bucket: impl Into<String>) -> Self {
        Self::Mock {
            bucket: bucket.into(),
        }
    }

    pub fn live(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self::Live {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            token,
        }
    }

    /// Create the appropriate ObjectStore implementation.
    pub fn into_store(self) -> Arc<dyn ObjectStore> {
        match self {
            Self::Mock { bucket } => Arc::new(MockObjectStore::new(&bucket)),
            Self::Live {
                endpoint,
                bucket,
                token,
            } => Arc::new(HttpObjectStore::new(&endpoint, &bucket).with_token(token)),
        }
    }
}
