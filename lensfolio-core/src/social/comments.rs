use crate::error::ValidationError;
use crate::helper::now;
use crate::ids::CommentId;
use crate::model::{Comment, FieldPatch};

/// Build a comment with a client id and the current time.
///
/// Author and text are trimmed and must both be non-empty.
pub fn new_comment(author: &str, text: &str) -> Result<Comment, ValidationError> {
    let author = author.trim();
    let content = text.trim();
    if author.is_empty() {
        return Err(ValidationError::new("author", "must not be empty"));
    }
    if content.is_empty() {
        return Err(ValidationError::new("comment", "must not be empty"));
    }
    Ok(Comment {
        id: CommentId::new(),
        author: author.to_string(),
        avatar: None,
        content: content.to_string(),
        timestamp: now(),
    })
}

/// Attach an avatar URL; a blank one leaves the comment without.
pub fn with_avatar(mut comment: Comment, avatar: Option<&str>) -> Comment {
    comment.avatar = avatar
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    comment
}

pub fn comment_patch(comment: Comment) -> FieldPatch {
    FieldPatch {
        append_comment: Some(comment),
        ..FieldPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_assigns_id() {
        let first = new_comment("  Ana ", " Preciosa luz \n").unwrap();
        let second = new_comment("Ana", "Otra").unwrap();
        assert_eq!(first.author, "Ana");
        assert_eq!(first.content, "Preciosa luz");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_blank_avatar_is_dropped() {
        let comment = new_comment("Ana", "Preciosa").unwrap();
        assert_eq!(with_avatar(comment.clone(), Some("  ")).avatar, None);
        let pictured = with_avatar(comment, Some(" https://cdn.example.com/ana.png "));
        assert_eq!(pictured.avatar.as_deref(), Some("https://cdn.example.com/ana.png"));
    }

    #[test]
    fn test_blank_fields_rejected() {
        assert_eq!(new_comment("   ", "hi").unwrap_err().field, "author");
        assert_eq!(new_comment("Ana", "\t").unwrap_err().field, "comment");
    }
}
