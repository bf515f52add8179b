//! Request-level operations on posts and comments.
//!
//! Services validate input, talk to `Persistence`, and for new comments
//! notify live subscribers through the broker `Registry`.

pub mod comment_service;
pub mod post_service;

pub use comment_service::CommentService;
pub use post_service::PostService;

use crate::utils::error::ServiceError;

/// Longest accepted post or comment body, in characters.
pub const CONTENT_MAX_LEN: usize = 2000;

fn check_page(page: Option<i32>) -> Result<(), ServiceError> {
    match page {
        Some(p) if p <= 0 => Err(ServiceError::BadRequest(
            "page must be greater than zero".to_string(),
        )),
        _ => Ok(()),
    }
}

fn check_content(kind: &str, content: &str) -> Result<(), ServiceError> {
    if content.chars().count() > CONTENT_MAX_LEN {
        return Err(ServiceError::BadRequest(format!(
            "{kind} content should not exceed {CONTENT_MAX_LEN} characters"
        )));
    }
    Ok(())
}
