//! Blob storage types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::helper::content_hash;

/// SHA-256 hex digest identifying a stored blob
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHash(String);

impl BlobHash {
    pub fn from_data(data: &[u8]) -> Self {
        Self(content_hash(data))
    }

    pub fn from_string(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
