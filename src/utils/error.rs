//! The `error` module defines the error types used within `postfeed`.
//!
//! Each layer has its own enum; lower-level errors convert into the layer
//! above through `#[from]` so they can be propagated with `?`.

use thiserror::Error;
use uuid::Uuid;

use crate::models::PostId;

/// Errors returned by the subscription registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// `unsubscribe` targeted a post that never had a subscriber list.
    #[error("no subscribers registered for post {0}")]
    NotFound(PostId),
}

/// Errors returned by the sled-backed store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("failed to encode or decode record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("corrupt index entry: {0}")]
    Corrupt(String),

    #[error("record {0} not found")]
    NotFound(Uuid),
}

/// Errors returned by the post and comment services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was rejected before touching storage.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(#[from] PersistenceError),
}
