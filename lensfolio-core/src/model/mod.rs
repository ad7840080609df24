//! Catalog data model

mod category;
pub(crate) mod draft;
mod entity;
mod media;
mod patch;
mod principal;
mod social;
mod synthetic;

pub use category::{Category, PhotoCategory, VideoCategory};
pub use draft::{EntityDraft, MediaBlob, MediaSource, RetryableCreate};
pub use entity::{Entity, MediaInfo, Tags};
pub use media::{storage_path, upload_extension, DurableRef, MediaKind, MediaRef};
pub use patch::FieldPatch;
pub use principal::{AnonymousPolicy, OwnershipPolicy, Principal};
pub use social::{Comment, ReactionKind, Reactions};
pub use synthetic::{CatalogItem, SyntheticEntity, SyntheticId};
