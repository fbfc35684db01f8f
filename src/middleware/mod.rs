//! Middleware for observability.
//!
//! This module provides request logging with latency tracking and
//! correlation ids.

pub mod logging;

pub use logging::request_logging;
