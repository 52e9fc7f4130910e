//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart video upload with content type and size limits
//! - Frame extraction to a ZIP archive through the media pipeline
//! - Request correlation ids and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
