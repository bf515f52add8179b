use tracing::{error, info};

use super::{check_content, check_page};
use crate::models::{NewPost, Post, PostId};
use crate::persistence::Persistence;
use crate::utils::error::{PersistenceError, ServiceError};
use crate::utils::paging::{PAGE_SIZE, offset_and_limit};

#[derive(Debug, Clone)]
pub struct PostService {
    persistence: Persistence,
}

impl PostService {
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    pub fn create_post(&self, req: NewPost) -> Result<Post, ServiceError> {
        if req.title.trim().is_empty() {
            return Err(ServiceError::BadRequest("post must have a title".into()));
        }
        if req.author.trim().is_empty() {
            return Err(ServiceError::BadRequest("post must have an author".into()));
        }
        check_content("post", &req.content)?;

        let post = self.persistence.create_post(req).inspect_err(|e| {
            error!("error creating post: {e}");
        })?;
        info!("created post {}", post.id);
        Ok(post)
    }

    pub fn get_post(&self, id: PostId) -> Result<Post, ServiceError> {
        match self.persistence.get_post(id) {
            Ok(post) => Ok(post),
            Err(PersistenceError::NotFound(_)) => Err(ServiceError::NotFound(format!(
                "post with id: {id} not found"
            ))),
            Err(e) => {
                error!("error getting post {id}: {e}");
                Err(e.into())
            }
        }
    }

    /// Posts newest first, `PAGE_SIZE` per page. Pages start at 1.
    pub fn list_posts(&self, page: Option<i32>) -> Result<Vec<Post>, ServiceError> {
        check_page(page)?;
        let (offset, limit) = offset_and_limit(page, PAGE_SIZE);

        let posts = self.persistence.list_posts(offset, limit).inspect_err(|e| {
            error!("error listing posts: {e}");
        })?;
        Ok(posts)
    }
}
