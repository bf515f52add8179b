use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::{Db, Tree};
use uuid::Uuid;

use crate::models::{Comment, NewComment, NewPost, Post, PostId};
use crate::utils::error::PersistenceError;

const POSTS: &str = "posts";
const POST_ORDER: &str = "posts_by_time";
const COMMENTS: &str = "comments";

#[derive(Clone)]
pub struct Persistence {
    db: Db,
}

impl Persistence {
    pub fn open(path: &str) -> Result<Self, PersistenceError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn create_post(&self, req: NewPost) -> Result<Post, PersistenceError> {
        let post = Post {
            id: Uuid::new_v4(),
            title: req.title,
            author: req.author,
            content: req.content,
            comments_allowed: req.comments_allowed,
            created_at: Utc::now(),
        };

        insert(&self.db.open_tree(POSTS)?, post.id.as_bytes(), &post)?;
        self.db
            .open_tree(POST_ORDER)?
            .insert(self.next_key()?, &post.id.as_bytes()[..])?;
        Ok(post)
    }

    pub fn get_post(&self, id: PostId) -> Result<Post, PersistenceError> {
        get(&self.db.open_tree(POSTS)?, id)
    }

    /// Posts newest first.
    pub fn list_posts(&self, offset: usize, limit: usize) -> Result<Vec<Post>, PersistenceError> {
        let posts = self.db.open_tree(POSTS)?;
        self.db
            .open_tree(POST_ORDER)?
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .map(|entry| {
                let (_, id) = entry?;
                let id = Uuid::from_slice(&id).map_err(|_| corrupt_key())?;
                get(&posts, id)
            })
            .collect()
    }

    /// Stores a comment and indexes it under its post, or under its parent
    /// when it is a reply.
    pub fn create_comment(&self, req: NewComment) -> Result<Comment, PersistenceError> {
        let comment = Comment {
            id: Uuid::new_v4(),
            author: req.author,
            content: req.content,
            post_id: req.post_id,
            parent_comment_id: req.parent_comment_id,
            created_at: Utc::now(),
        };

        insert(
            &self.db.open_tree(COMMENTS)?,
            comment.id.as_bytes(),
            &comment,
        )?;
        let index = match comment.parent_comment_id {
            Some(parent) => self.replies_tree(parent)?,
            None => self.post_comments_tree(comment.post_id)?,
        };
        insert(&index, &self.next_key()?, &comment)?;
        Ok(comment)
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Comment, PersistenceError> {
        get(&self.db.open_tree(COMMENTS)?, id)
    }

    /// Top-level comments of a post, newest first.
    pub fn comments_for_post(
        &self,
        post_id: PostId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, PersistenceError> {
        self.post_comments_tree(post_id)?
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .map(|entry| decode(&entry?.1))
            .collect()
    }

    /// Direct replies to a comment, newest first.
    pub fn replies(&self, parent_comment_id: Uuid) -> Result<Vec<Comment>, PersistenceError> {
        self.replies_tree(parent_comment_id)?
            .iter()
            .rev()
            .map(|entry| decode(&entry?.1))
            .collect()
    }

    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    fn post_comments_tree(&self, post_id: PostId) -> Result<Tree, PersistenceError> {
        Ok(self.db.open_tree(format!("post_comments/{post_id}"))?)
    }

    fn replies_tree(&self, parent: Uuid) -> Result<Tree, PersistenceError> {
        Ok(self.db.open_tree(format!("replies/{parent}"))?)
    }

    // Monotonic across the whole database, big-endian so keys sort by age.
    fn next_key(&self) -> Result<[u8; 8], PersistenceError> {
        Ok(self.db.generate_id()?.to_be_bytes())
    }
}

fn insert<T: Serialize>(tree: &Tree, key: &[u8], value: &T) -> Result<(), PersistenceError> {
    tree.insert(key, serde_json::to_vec(value)?)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &Tree, id: Uuid) -> Result<T, PersistenceError> {
    match tree.get(id.as_bytes())? {
        Some(raw) => decode(&raw),
        None => Err(PersistenceError::NotFound(id)),
    }
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, PersistenceError> {
    Ok(serde_json::from_slice(raw)?)
}

fn corrupt_key() -> PersistenceError {
    PersistenceError::Corrupt("malformed post id in index".to_string())
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("db", &"sled::Db")
            .finish()
    }
}
