//! Error types surfaced by the catalog engine

use std::time::Duration;
use thiserror::Error;

use crate::ids::EntityId;
use crate::model::RetryableCreate;
use crate::remote::RemoteError;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Rejected input, raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A record the normalizer could not turn into an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record{}: {reason}", .record_id.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
pub struct MalformedEntity {
    pub record_id: Option<String>,
    pub reason: String,
}

impl MalformedEntity {
    pub fn new(record_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            record_id,
            reason: reason.into(),
        }
    }
}

/// A cache write would exceed the configured byte budget.
///
/// Cache backends return this inside `anyhow::Error`; the engine recovers it
/// with a downcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cache quota exceeded: write needs {needed} bytes, {available} available")]
pub struct QuotaExceeded {
    pub needed: u64,
    pub available: u64,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("network failure during {op}: {message}")]
    Network { op: &'static str, message: String },

    #[error("remote rejected {op}: {message}")]
    RemoteRejected {
        op: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error(transparent)]
    MalformedEntity(#[from] MalformedEntity),

    #[error(transparent)]
    StorageQuotaExceeded(#[from] QuotaExceeded),

    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// Upload or insert failed; the optimistic entity was rolled back and the
    /// original draft is handed back for a retry.
    #[error("upload failed: {source}")]
    UploadFailed {
        retry: Box<RetryableCreate>,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("local storage error: {0}")]
    Storage(anyhow::Error),
}

impl CatalogError {
    pub(crate) fn from_remote(op: &'static str, err: RemoteError) -> Self {
        match err {
            RemoteError::Network(message) => CatalogError::Network { op, message },
            RemoteError::Rejected { status, message } => {
                CatalogError::RemoteRejected { op, status, message }
            }
        }
    }

    /// Wrap a store error, surfacing quota failures as their own variant.
    pub fn storage(err: anyhow::Error) -> Self {
        match err.downcast::<QuotaExceeded>() {
            Ok(quota) => CatalogError::StorageQuotaExceeded(quota),
            Err(other) => CatalogError::Storage(other),
        }
    }

    /// Whether the failure came from talking to the remote service.
    pub fn is_remote(&self) -> bool {
        match self {
            CatalogError::Network { .. }
            | CatalogError::RemoteRejected { .. }
            | CatalogError::Timeout { .. } => true,
            CatalogError::UploadFailed { source, .. } => source.is_remote(),
            _ => false,
        }
    }

    /// The draft to retry with, if this was a failed create.
    pub fn retry(&self) -> Option<&RetryableCreate> {
        match self {
            CatalogError::UploadFailed { retry, .. } => Some(retry),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_survives_anyhow_roundtrip() {
        let err = anyhow::Error::new(QuotaExceeded {
            needed: 10,
            available: 2,
        });
        match CatalogError::from(err) {
            CatalogError::StorageQuotaExceeded(q) => assert_eq!(q.needed, 10),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_other_anyhow_is_storage() {
        let err = CatalogError::from(anyhow::anyhow!("disk on fire"));
        assert!(matches!(err, CatalogError::Storage(_)));
        assert!(!err.is_remote());
    }

    #[test]
    fn test_remote_mapping() {
        let err = CatalogError::from_remote("insert_row", RemoteError::Network("reset".into()));
        assert!(err.is_remote());
        assert!(err.to_string().contains("insert_row"));
    }
}
