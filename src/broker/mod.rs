//! broker
//!
//! The live comment fanout: a process-local registry mapping posts to the
//! subscribers watching them, and the handles those subscribers drain.
//!
//! Public types:
//! - `Registry`: subscribe, unsubscribe and best-effort publish.
//! - `CommentStream`: consumer side of one subscription.
//! - `SubscriberId`: registry-local id, never reused.
//!
//! The comment service publishes after persisting a comment; the WebSocket
//! transport subscribes and unsubscribes on behalf of connected clients.

pub mod engine;
pub mod subscriber;
pub mod topic;

pub use engine::{DEFAULT_PUBLISH_TIMEOUT, PublishReport, Registry};
pub use subscriber::{CommentStream, Subscriber, SubscriberId};

#[cfg(test)]
mod tests;
