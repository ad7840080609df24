//! Shared utilities for storage implementations

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

/// Current wall-clock time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Compute the SHA-256 hex digest of binary content
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Interpret a unix timestamp in milliseconds
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
