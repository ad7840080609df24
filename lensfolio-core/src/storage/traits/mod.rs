//! Storage trait definitions
//!
//! All storage traits are defined here, with implementations in `implementations/`.

mod blob;
mod cache;

pub use blob::BlobStore;
pub use cache::CacheStore;

use crate::remote::RemoteClient;

/// Bundles the backends a catalog engine runs on into a single trait.
///
/// ```ignore
/// pub struct DesktopCatalog;
///
/// impl CatalogTypes for DesktopCatalog {
///     type Remote = HttpRemote;
///     type Cache = SqliteCacheStore;
///     type Blob = FsBlobStore;
/// }
///
/// type DesktopEngine = CatalogEngine<DesktopCatalog>;
/// ```
pub trait CatalogTypes: Send + Sync + 'static {
    /// Remote persistence service (rows and media objects)
    type Remote: RemoteClient + Send + Sync + 'static;
    /// Local entity cache and pending-mutation log
    type Cache: CacheStore + Send + Sync + 'static;
    /// Local blob store for optimistic media previews
    type Blob: BlobStore + Send + Sync + 'static;
}
