use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a post. Also the topic key for live comment subscriptions.
pub type PostId = Uuid;

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub author: String,
    pub content: String,
    pub comments_allowed: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post. `id` and `created_at` are assigned by storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub author: String,
    pub content: String,
    #[serde(default = "default_comments_allowed")]
    pub comments_allowed: bool,
}

fn default_comments_allowed() -> bool {
    true
}
