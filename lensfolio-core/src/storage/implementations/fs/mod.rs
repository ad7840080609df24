//! Filesystem-backed storage

mod blob;

pub use blob::FsBlobStore;
