//! Local storage: entity cache, pending-mutation log and media blobs
//!
//! Traits live in `traits/`, value types in `types/`, backends in
//! `implementations/`.

pub mod implementations;
pub mod traits;
pub mod types;

pub use implementations::fs::FsBlobStore;
pub use implementations::memory::{MemoryBlobStore, MemoryCacheStore, MemoryCatalog};
#[cfg(feature = "sqlite")]
pub use implementations::sqlite::SqliteCacheStore;
pub use traits::{BlobStore, CacheStore, CatalogTypes};
pub use types::{BlobHash, CacheFilter, CacheUsage, PendingMutation, PendingOp};
