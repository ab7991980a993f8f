//! In-memory object store for testing and local development.
//!
//! `MockObjectStore` implements both [`ObjectStore`] and [`Bucket`]. Objects
//! inserted with [`MockObjectStore::insert`] sit at their plain key, the way
//! an external party would upload them; archived objects are stored under
//! their versioned `key@hash` storage key. Use separate instances for a feed
//! bucket and an archive.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    content_hash, validate_key, Bucket, CosError, ObjectRef, ObjectStore, ObjectSummary, Result,
};

pub struct MockObjectStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
    /// Number of `put` calls that actually stored a new object.
    writes: AtomicUsize,
}

impl MockObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: RwLock::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create a bucket pre-populated with `key -> bytes` objects.
    pub fn with_objects<K, B>(bucket: &str, objects: impl IntoIterator<Item = (K, B)>) -> Self
    where
        K: Into<String>,
        B: Into<Bytes>,
    {
        let store = Self::new(bucket);
        for (key, bytes) in objects {
            store.insert(key, bytes);
        }
        store
    }

    /// Place an object at its plain key, replacing any previous content.
    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Bytes>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), bytes.into());
    }

    pub fn remove(&self, key: &str) -> Option<Bytes> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<ObjectRef> {
        validate_key(key)?;
        let object = ObjectRef::for_bytes(&self.bucket, key, &bytes);
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let storage_key = object.storage_key();
        if !objects.contains_key(&storage_key) {
            objects.insert(storage_key, bytes);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(object)
    }

    async fn get(&self, object: &ObjectRef) -> Result<Bytes> {
        let storage_key = object.storage_key();
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&storage_key)
            .cloned()
            .ok_or(CosError::NotFound(storage_key))
    }
}

#[async_trait]
impl Bucket for MockObjectStore {
    fn name(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self) -> Result<Vec<ObjectSummary>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .iter()
            .map(|(key, bytes)| ObjectSummary {
                key: key.clone(),
                size: bytes.len() as u64,
                version: content_hash(bytes),
            })
            .collect())
    }

    async fn download(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| CosError::NotFound(format!("key not found in mock: {}", key)))
    }
}
