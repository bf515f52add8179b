//! # postfeed
//!
//! `postfeed` is a small posts-and-comments server with live comment
//! notifications. Clients talk JSON over WebSockets; anyone watching a post
//! receives new comments on it as they are created.
//!
//! ## Core Modules
//!
//! - `broker`: The subscription registry that fans new comments out to the
//!   subscribers of a post, with bounded-time best-effort delivery.
//! - `client`: Represents a connected WebSocket client and its subscriptions.
//! - `config`: Handles loading and managing server configuration.
//! - `models`: Post and comment records.
//! - `persistence`: Stores posts and comments in an embedded `sled` database.
//! - `service`: Validation and the comment-creation path that publishes to the registry.
//! - `transport`: Manages the WebSocket server and communication with clients.
//! - `utils`: Shared utilities, such as error types, logging and paging.

pub mod broker;
pub mod client;
pub mod config;
pub mod models;
pub mod persistence;
pub mod service;
pub mod transport;
pub mod utils;
