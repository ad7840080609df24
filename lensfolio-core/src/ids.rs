//! Type-safe ID newtypes
//!
//! Remote-assigned ids are opaque strings (the backend may hand out integers
//! or UUIDs), so every id wraps a `String`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix that marks a client-generated placeholder id.
pub const TEMPORARY_PREFIX: &str = "tmp-";

macro_rules! define_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string (for loading from storage)
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        #[cfg(feature = "sqlite")]
        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value.as_str().map(|s| Self(s.to_string()))
            }
        }

        #[cfg(feature = "sqlite")]
        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::Borrowed(
                    rusqlite::types::ValueRef::Text(self.0.as_bytes()),
                ))
            }
        }
    };
}

macro_rules! random_id {
    ($name:ident) => {
        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

define_id!(EntityId, "Identifier of a photo or video, temporary until the remote confirms it");
define_id!(CommentId, "Client-generated identifier of a comment");
define_id!(PrincipalId, "Identifier of an authenticated principal");
define_id!(MutationId, "Identifier of an entry in the pending-mutation log");

random_id!(CommentId);
random_id!(MutationId);

impl EntityId {
    /// Fresh placeholder id used until the remote assigns a durable one
    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMPORARY_PREFIX, Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_ids_are_unique_and_flagged() {
        let a = EntityId::temporary();
        let b = EntityId::temporary();
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(!EntityId::from_string("42").is_temporary());
    }

    #[test]
    fn test_id_display() {
        let id = PrincipalId::from_string("user-abc");
        assert_eq!(format!("{}", id), "user-abc");
    }

    #[test]
    fn test_id_serde() {
        let id = EntityId::from_string("42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"42\"");

        let parsed: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
