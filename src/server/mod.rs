//! Axum-based HTTP host for the cache router.
//!
//! The server stands where the browser's background worker stood: every
//! request a page makes goes through it and is answered by the
//! [`CacheRouter`](crate::router::CacheRouter). A handful of reserved
//! `/_edge/*` endpoints carry the worker's other event flows.
//!
//! # Components
//!
//! - `handlers`: Control messages, push, notification clicks, sync, page
//!   channels, and the catch-all proxy.
//! - `middleware`: Request ID tracking and version stamping.
//! - `routes`: The router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthResponse, HealthStatus};
pub use middleware::VERSION_HEADER;
pub use routes::{create_router, AppState};
