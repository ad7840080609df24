//! Remote persistence contract
//!
//! The hosted service stores rows in tables and media objects in buckets.
//! The engine receives a [`RemoteClient`] at construction; nothing here is a
//! process-wide singleton.

mod memory;
#[cfg(feature = "http")]
mod http;

pub use memory::{MemoryRemote, RemoteOp};
#[cfg(feature = "http")]
pub use http::HttpRemote;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::ids::EntityId;
use crate::model::{DurableRef, Principal};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never got an answer
    #[error("network error: {0}")]
    Network(String),
    /// The service answered and refused
    #[error("rejected{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Rejected {
        status: Option<u16>,
        message: String,
    },
}

impl RemoteError {
    pub fn rejected(message: impl Into<String>) -> Self {
        RemoteError::Rejected {
            status: None,
            message: message.into(),
        }
    }
}

/// Equality filters for `query_rows`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub eq: Vec<(String, String)>,
}

impl RowFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.eq.iter().all(|(column, expected)| {
            match row.get(column) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOrder {
    pub column: String,
    pub descending: bool,
}

impl RowOrder {
    pub fn newest_first() -> Self {
        Self {
            column: "created_at".to_string(),
            descending: true,
        }
    }
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<DurableRef, RemoteError>;

    /// Public URL of a stored object; computed locally, no request.
    fn public_url(&self, media: &DurableRef) -> String;

    async fn delete_blob(&self, media: &DurableRef) -> Result<(), RemoteError>;

    /// Insert a row and return it as stored, including the assigned id.
    async fn insert_row(&self, table: &str, record: Value) -> Result<Value, RemoteError>;

    async fn update_row(&self, table: &str, id: &EntityId, fields: Value)
    -> Result<(), RemoteError>;

    /// Deleting an absent row succeeds.
    async fn delete_row(&self, table: &str, id: &EntityId) -> Result<(), RemoteError>;

    async fn query_rows(
        &self,
        table: &str,
        filter: &RowFilter,
        order: &RowOrder,
    ) -> Result<Vec<Value>, RemoteError>;

    async fn current_principal(&self) -> Principal;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_strings_and_numbers() {
        let row = json!({"id": 42, "category": "urban"});
        assert!(RowFilter::all().eq("id", "42").matches(&row));
        assert!(RowFilter::all().eq("category", "urban").matches(&row));
        assert!(!RowFilter::all().eq("category", "wildlife").matches(&row));
        assert!(!RowFilter::all().eq("owner_id", "u1").matches(&row));
    }
}
