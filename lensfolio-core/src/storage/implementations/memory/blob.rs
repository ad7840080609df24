//! In-memory BlobStore implementation

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::storage::traits::BlobStore;
use crate::storage::types::BlobHash;

/// In-memory blob store for testing
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobHash, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, data: &[u8]) -> Result<BlobHash> {
        let hash = BlobHash::from_data(data);
        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert(hash.clone(), data.to_vec());
        Ok(hash)
    }

    async fn get(&self, hash: &BlobHash) -> Result<Vec<u8>> {
        let blobs = self.blobs.lock().unwrap();
        blobs
            .get(hash)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Blob not found: {}", hash))
    }

    async fn exists(&self, hash: &BlobHash) -> bool {
        self.blobs.lock().unwrap().contains_key(hash)
    }

    async fn delete(&self, hash: &BlobHash) -> Result<bool> {
        Ok(self.blobs.lock().unwrap().remove(hash).is_some())
    }
}
