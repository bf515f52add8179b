//! The `client` module defines the representation of a connected client.
//!
//! It provides the `Client` struct, which encapsulates the state of a single
//! WebSocket connection: its identifier, the channel for sending messages to
//! it, and the live comment subscriptions it has opened.

pub mod pubsub_client;
pub use pubsub_client::{Client, Subscription};
