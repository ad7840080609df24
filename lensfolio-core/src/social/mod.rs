//! Reactions, likes and comments
//!
//! Each helper turns a user gesture into the [`FieldPatch`] that the engine
//! applies optimistically and persists through `update_fields`.
//!
//! [`FieldPatch`]: crate::model::FieldPatch

mod comments;
mod likes;
mod reactions;

pub use comments::{comment_patch, new_comment, with_avatar};
pub use likes::like_patch;
pub use reactions::{reaction_patch, ReactionState};
