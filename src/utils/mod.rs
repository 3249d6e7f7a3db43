//! Utility functions and helpers for smartsports-edge.
//!
//! This module provides cross-cutting concerns like structured logging
//! and redaction of credentials carried in logged URLs.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and URL sanitization.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
