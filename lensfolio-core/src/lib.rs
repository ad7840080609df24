//! Catalog and optimistic-sync engine for the lensfolio portfolio
//!
//! This crate provides:
//! - **Model**: `Entity`, `EntityDraft`, `FieldPatch` and the media/category types
//! - **Normalizer**: every historical record shape turned into one `Entity`
//! - **Storage**: `CacheStore` and `BlobStore` traits with memory, filesystem
//!   and SQLite backends
//! - **Remote**: the `RemoteClient` contract with `MemoryRemote` and `HttpRemote`
//! - **Engine**: `CatalogEngine`, optimistic mutations reconciled in the background
//! - **Views**: filtering, pagination and lightbox navigation over snapshots
//!
//! # Example
//!
//! ```ignore
//! use lensfolio_core::{CatalogEngine, EngineConfig, MemoryCatalog};
//!
//! let engine = CatalogEngine::<MemoryCatalog>::new(remote, cache, blobs, EngineConfig::default());
//! let loaded = engine.load_catalog(None).await?;
//! let report = loaded.outcome.settled().await?;
//! ```
pub mod catalog;
pub mod error;
pub mod helper;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod remote;
pub mod share;
pub mod social;
pub mod storage;
pub mod video;
pub mod views;

pub use catalog::{
    CatalogEngine, CatalogEvent, DeleteOutcome, DetailHandle, EngineConfig, Optimistic, Orphan,
    Pending, RecoveryReport, RefreshReport,
};
pub use error::{CatalogError, MalformedEntity, QuotaExceeded, ValidationError};
pub use ids::{CommentId, EntityId, MutationId, PrincipalId};
pub use model::{
    Category, CatalogItem, Comment, DurableRef, Entity, EntityDraft, FieldPatch, MediaBlob,
    MediaKind, MediaRef, MediaSource, PhotoCategory, Principal, ReactionKind, Reactions,
    RetryableCreate, SyntheticEntity, Tags, VideoCategory,
};
pub use normalize::Normalizer;
pub use remote::{MemoryRemote, RemoteClient, RemoteError};
#[cfg(feature = "http")]
pub use remote::HttpRemote;
pub use share::ShareLinks;
pub use storage::{CatalogTypes, MemoryCatalog};
pub use video::{VideoLink, VideoProvider};
pub use views::{Lightbox, Page, Paginator, ViewFilter};
