//! Storage backend implementations
//!
//! - `memory` - In-memory stores for tests and offline demos
//! - `fs` - Filesystem blob store
//! - `sqlite` - SQLite cache store (requires `sqlite` feature)

pub mod fs;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
