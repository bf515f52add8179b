//! The `transport` module is responsible for handling network communication
//! with clients via WebSockets.
//!
//! It defines the JSON protocol used between clients and the server, and
//! implements the WebSocket server itself: request dispatch to the post and
//! comment services, and the live comment subscription lifecycle.

pub mod message;
pub mod websocket;

pub use websocket::{AppState, serve, start_websocket_server};
