//! Common validation rules shared across request payloads.

use validator::ValidationError;

pub const MAX_MESSAGE_LENGTH: usize = 1000;
pub const MAX_REVIEWER_COMMENT_LENGTH: usize = 500;
pub const MAX_ATTACHMENTS_PER_REQUEST: usize = 5;

/// Validates an application message.
///
/// Requirements:
/// - Not blank
/// - At most 1000 characters
pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        return Err(ValidationError::new("message_required"));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::new("message_too_long"));
    }
    Ok(())
}

/// Validates a reviewer's decision comment. The comment may be empty; it is
/// only capped at 500 characters.
pub fn validate_reviewer_comment(comment: &str) -> Result<(), ValidationError> {
    if comment.chars().count() > MAX_REVIEWER_COMMENT_LENGTH {
        return Err(ValidationError::new("comment_too_long"));
    }
    Ok(())
}

/// Validates the number of attachments in a single submission.
pub fn validate_attachment_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_ATTACHMENTS_PER_REQUEST {
        return Err(ValidationError::new("too_many_attachments"));
    }
    Ok(())
}
