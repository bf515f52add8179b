//! Client representation
//!
//! `Client` models a connected client and holds the sending side of a
//! per-connection channel. Every live subscription owns a forwarding task
//! that drains its `CommentStream` into that channel. When the connection
//! ends, `close` unsubscribes everything so the registry never keeps streams
//! for clients that are gone.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::{Registry, SubscriberId};
use crate::models::PostId;

/// A live subscription held by a connection.
#[derive(Debug)]
pub struct Subscription {
    pub subscriber_id: SubscriberId,
    pub forwarder: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Client {
    pub id: String,
    pub sender: UnboundedSender<WsMessage>,
    subscriptions: HashMap<PostId, Subscription>,
}

impl Client {
    /// Create a new client with a sender channel. The `id` is a UUID used
    /// to identify the connection in logs.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            subscriptions: HashMap::new(),
        }
    }

    /// Serializes `msg` as JSON and queues it for the connection.
    /// Returns `false` if the connection's writer is gone.
    pub fn send<T: Serialize>(&self, msg: &T) -> bool {
        send_json(&self.sender, msg)
    }

    pub fn is_subscribed(&self, post_id: &PostId) -> bool {
        self.subscriptions.contains_key(post_id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn add_subscription(&mut self, post_id: PostId, subscription: Subscription) {
        self.subscriptions.insert(post_id, subscription);
    }

    pub fn take_subscription(&mut self, post_id: &PostId) -> Option<Subscription> {
        self.subscriptions.remove(post_id)
    }

    /// Unsubscribes every live subscription. Failures are logged and skipped
    /// so teardown always completes.
    pub fn close(&mut self, registry: &Registry) {
        for (post_id, subscription) in self.subscriptions.drain() {
            if let Err(e) = registry.unsubscribe(post_id, subscription.subscriber_id) {
                warn!("client {} cleanup: {e}", self.id);
            }
        }
        debug!("client {} closed", self.id);
    }
}

/// Shared by the client and its forwarding tasks, which only hold a sender.
pub fn send_json<T: Serialize>(sender: &UnboundedSender<WsMessage>, msg: &T) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(WsMessage::text(json)).is_ok(),
        Err(e) => {
            warn!("failed to serialize message: {e}");
            false
        }
    }
}
