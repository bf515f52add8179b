//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `postfeed` application.
//!
//! It centralizes the error types, logging setup and page arithmetic shared by
//! the storage, service and transport layers.

pub mod error;
pub mod logging;
pub mod paging;
