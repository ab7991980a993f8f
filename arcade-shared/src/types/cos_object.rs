use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CosObjectId;

/// Location of a bulk-stored artifact that is about to be recorded in the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCosObject {
    pub bucket: String,
    pub key: String,
    pub content_hash: String,
    pub size: u64,
}

impl NewCosObject {
    /// Unique reference of the object version: `bucket/key@hash`.
    ///
    /// Different content under the same key yields a different reference, so
    /// a changed artifact is recorded as a new object instead of mutating the
    /// old one.
    pub fn reference(&self) -> String {
        format!("{}/{}@{}", self.bucket, self.key, self.content_hash)
    }
}

/// An immutable artifact stored in a bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosObject {
    pub id: CosObjectId,
    pub bucket: String,
    pub key: String,
    pub content_hash: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl CosObject {
    pub fn reference(&self) -> String {
        format!("{}/{}@{}", self.bucket, self.key, self.content_hash)
    }
}
