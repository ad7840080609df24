//! Content-addressable storage for optimistic media previews
//!
//! Files are stored by their SHA-256 hash, so picking the same file twice
//! stores it once.

use crate::storage::traits::BlobStore;
use crate::storage::types::BlobHash;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Content-addressable blob storage on filesystem
///
/// Files are stored in a sharded directory structure based on the first 2 characters
/// of their SHA-256 hash: `{root}/{hash[0:2]}/{hash}`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the filesystem path for a blob
    pub fn path_for(&self, hash: &BlobHash) -> PathBuf {
        let hash = hash.as_str();
        if hash.len() < 2 {
            return self.root.join(hash);
        }
        self.root.join(&hash[0..2]).join(hash)
    }

    /// Remove temp files left behind by interrupted writes
    pub async fn cleanup_temp_files(&self) -> anyhow::Result<usize> {
        let mut cleaned = 0;

        if !fs::try_exists(&self.root).await? {
            return Ok(0);
        }

        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            let shard_path = shard.path();
            if !shard_path.is_dir() {
                continue;
            }

            let mut blobs = fs::read_dir(&shard_path).await?;
            while let Some(blob) = blobs.next_entry().await? {
                let blob_path = blob.path();
                if blob_path.extension().is_some_and(|ext| ext == "tmp") {
                    fs::remove_file(&blob_path).await?;
                    cleaned += 1;
                }
            }
        }

        Ok(cleaned)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, data: &[u8]) -> anyhow::Result<BlobHash> {
        let hash = BlobHash::from_data(data);
        let path = self.path_for(&hash);

        if fs::try_exists(&path).await? {
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using a temp file
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        Ok(hash)
    }

    async fn get(&self, hash: &BlobHash) -> anyhow::Result<Vec<u8>> {
        Ok(fs::read(self.path_for(hash)).await?)
    }

    async fn exists(&self, hash: &BlobHash) -> bool {
        fs::try_exists(self.path_for(hash)).await.unwrap_or(false)
    }

    async fn delete(&self, hash: &BlobHash) -> anyhow::Result<bool> {
        let path = self.path_for(hash);
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_blob_store() -> FsBlobStore {
        let dir = env::temp_dir().join(format!("lensfolio_blob_test_{}", uuid::Uuid::new_v4()));
        FsBlobStore::new(dir)
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = temp_blob_store();
        let data = b"\xFF\xD8\xFF\xE0 fake jpeg".to_vec();

        let hash = store.store(&data).await.unwrap();
        assert_eq!(store.get(&hash).await.unwrap(), data);

        let path = store.path_for(&hash);
        assert_eq!(
            path.parent().unwrap().file_name().unwrap().to_str().unwrap(),
            &hash.as_str()[0..2]
        );

        fs::remove_dir_all(&store.root).await.ok();
    }

    #[tokio::test]
    async fn test_deduplication() {
        let store = temp_blob_store();
        let first = store.store(b"same").await.unwrap();
        let second = store.store(b"same").await.unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(&store.root).await.ok();
    }

    #[tokio::test]
    async fn test_delete_and_cleanup() {
        let store = temp_blob_store();
        let hash = store.store(b"Delete me").await.unwrap();
        assert!(store.exists(&hash).await);

        assert!(store.delete(&hash).await.unwrap());
        assert!(!store.exists(&hash).await);
        assert!(!store.delete(&hash).await.unwrap());

        let stray = store.path_for(&hash).with_extension("tmp");
        fs::write(&stray, b"partial").await.unwrap();
        assert_eq!(store.cleanup_temp_files().await.unwrap(), 1);

        fs::remove_dir_all(&store.root).await.ok();
    }
}
