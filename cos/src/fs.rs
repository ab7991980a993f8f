//! Bucket backed by a local directory.
//!
//! Keys are paths relative to the root, using `/` separators. Nested
//! directories are listed recursively.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{validate_key, Bucket, CosError, ObjectSummary, Result};

pub struct FileSystemBucket {
    name: String,
    root: PathBuf,
}

impl FileSystemBucket {
    pub fn new(name: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Bucket for FileSystemBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_objects(&self) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();

                objects.push(ObjectSummary {
                    key,
                    size: metadata.len(),
                    version: format!("{}-{}", metadata.len(), modified),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn download(&self, key: &str) -> Result<Bytes> {
        validate_key(key)?;
        match tokio::fs::read(self.root.join(key)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CosError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_nested_files_with_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("20201124_block_01")).unwrap();
        std::fs::write(dir.path().join("20201124_block_01/25544.oem"), "oem").unwrap();
        std::fs::write(dir.path().join("compliance.csv"), "aso_id").unwrap();

        let bucket = FileSystemBucket::new("ut-oem", dir.path());
        let listing = bucket.list_objects().await.unwrap();
        let keys: Vec<_> = listing.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["20201124_block_01/25544.oem", "compliance.csv"]);
        assert_eq!(listing[0].size, 3);

        let bytes = bucket.download("20201124_block_01/25544.oem").await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"oem"));
    }

    #[tokio::test]
    async fn test_missing_and_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FileSystemBucket::new("b", dir.path());
        assert!(matches!(bucket.download("missing.oem").await, Err(CosError::NotFound(_))));
        assert!(matches!(bucket.download("../secret").await, Err(CosError::InvalidKey(_))));
    }
}
