// src/error_handling/mod.rs
//! Error handling for the bridge engine
//!
//! Errors are surfaced synchronously to the caller of the failing
//! operation. Nothing is retried automatically; `BridgeError::is_retryable`
//! tells relayers which failures are worth another attempt.

pub mod error_types;

pub use error_types::{BridgeError, BridgeResult, ErrorCategory};
