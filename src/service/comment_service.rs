//! Comment creation and lookup.
//!
//! `create_comment` is the publishing side of the live feed: once a comment
//! is stored it is handed to the registry, which fans it out to everyone
//! watching the post. Delivery is best-effort and never fails the request.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use super::{check_content, check_page};
use crate::broker::Registry;
use crate::models::{Comment, NewComment, PostId};
use crate::persistence::Persistence;
use crate::utils::error::{PersistenceError, ServiceError};
use crate::utils::paging::{PAGE_SIZE, offset_and_limit};

#[derive(Debug, Clone)]
pub struct CommentService {
    persistence: Persistence,
    registry: Arc<Registry>,
}

impl CommentService {
    pub fn new(persistence: Persistence, registry: Arc<Registry>) -> Self {
        Self {
            persistence,
            registry,
        }
    }

    pub async fn create_comment(&self, req: NewComment) -> Result<Comment, ServiceError> {
        if req.author.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "comment must have an author".into(),
            ));
        }
        check_content("comment", &req.content)?;

        let post = match self.persistence.get_post(req.post_id) {
            Ok(post) => post,
            Err(PersistenceError::NotFound(_)) => {
                return Err(ServiceError::BadRequest(format!(
                    "post with id: {} does not exist",
                    req.post_id
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if !post.comments_allowed {
            return Err(ServiceError::BadRequest(format!(
                "post with id: {} does not allow comments",
                post.id
            )));
        }
        if let Some(parent_id) = req.parent_comment_id {
            self.check_parent(parent_id, post.id)?;
        }

        let comment = self.persistence.create_comment(req).inspect_err(|e| {
            error!("error creating comment: {e}");
        })?;
        info!("created comment {} on post {}", comment.id, comment.post_id);

        self.registry.publish(comment.post_id, comment.clone()).await;
        Ok(comment)
    }

    /// Top-level comments of a post, newest first.
    pub fn comments_for_post(
        &self,
        post_id: PostId,
        page: Option<i32>,
    ) -> Result<Vec<Comment>, ServiceError> {
        check_page(page)?;
        let (offset, limit) = offset_and_limit(page, PAGE_SIZE);

        let comments = self
            .persistence
            .comments_for_post(post_id, offset, limit)
            .inspect_err(|e| error!("error getting comments of post {post_id}: {e}"))?;
        Ok(comments)
    }

    pub fn replies(&self, comment_id: Uuid) -> Result<Vec<Comment>, ServiceError> {
        let replies = self
            .persistence
            .replies(comment_id)
            .inspect_err(|e| error!("error getting replies to {comment_id}: {e}"))?;
        Ok(replies)
    }

    fn check_parent(&self, parent_id: Uuid, post_id: PostId) -> Result<(), ServiceError> {
        match self.persistence.get_comment(parent_id) {
            Ok(parent) if parent.post_id == post_id => Ok(()),
            Ok(_) => Err(ServiceError::BadRequest(format!(
                "comment {parent_id} belongs to another post"
            ))),
            Err(PersistenceError::NotFound(_)) => Err(ServiceError::BadRequest(format!(
                "parent comment {parent_id} does not exist"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
