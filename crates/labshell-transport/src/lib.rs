//! REST transport for labshell sessions.
//!
//! Provides:
//! - Wire types for request and response bodies
//! - `ApiError` mapping store errors to HTTP responses
//! - The axum router and its handlers
//! - Per-client rate limiting

pub mod error;
pub mod protocol;
pub mod rate_limit;
pub mod routes;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use routes::{AppState, build_router};
