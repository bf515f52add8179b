//! The `persistence` module stores posts and comments.
//!
//! It uses `sled` as an embedded key-value store. Records are JSON encoded;
//! per-post comment lists and reply lists live in their own trees keyed by a
//! sled-generated sequence number so iteration follows creation order.

pub mod sled_store;

pub use sled_store::Persistence;

#[cfg(test)]
mod tests;
