//! Content records shared by the storage, service and transport layers.
//!
//! `Comment` doubles as the live event payload: the registry hands out
//! `Arc<Comment>` to every subscriber of the comment's post.

pub mod comment;
pub mod post;

pub use comment::{Comment, NewComment};
pub use post::{NewPost, Post, PostId};
