//! In-memory storage implementations for testing
//!
//! Provides in-memory versions of the storage traits, useful for testing
//! and offline demos.

mod blob;
mod cache;

pub use blob::MemoryBlobStore;
pub use cache::MemoryCacheStore;

use crate::remote::MemoryRemote;
use crate::storage::traits::CatalogTypes;

/// Everything in process: memory remote, memory cache, memory blobs
pub struct MemoryCatalog;

impl CatalogTypes for MemoryCatalog {
    type Remote = MemoryRemote;
    type Cache = MemoryCacheStore;
    type Blob = MemoryBlobStore;
}
