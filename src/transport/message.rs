//! Wire protocol
//!
//! JSON objects tagged by `type` (snake_case); fields are camelCase to match
//! the post and comment records they carry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::SubscriberId;
use crate::models::{Comment, NewComment, NewPost, Post, PostId};

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreatePost(NewPost),
    GetPost { post_id: PostId },
    ListPosts { page: Option<i32> },
    CreateComment(NewComment),
    Comments { post_id: PostId, page: Option<i32> },
    Replies { comment_id: Uuid },
    /// Start receiving `new_comment` messages for a post.
    Subscribe { post_id: PostId },
    Unsubscribe { post_id: PostId },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Post { post: Post },
    Posts { posts: Vec<Post> },
    Comment { comment: Comment },
    Comments { comments: Vec<Comment> },
    Subscribed { post_id: PostId, subscriber_id: SubscriberId },
    Unsubscribed { post_id: PostId },
    /// Pushed to subscribers, not a reply to a request.
    NewComment { comment: Comment },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
