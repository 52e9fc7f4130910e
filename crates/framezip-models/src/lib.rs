//! Shared data models for the framezip service.
//!
//! This crate provides Serde-serializable types for:
//! - Frame output formats
//! - Extraction requests and caller-facing parameter validation
//! - Extraction results and the JSON response schema

pub mod format;
pub mod request;
pub mod result;

// Re-export common types
pub use format::{FrameFormat, FrameFormatParseError};
pub use request::{
    ExtractionRequest, ProcessParams, RequestError, DEFAULT_INTERVAL_MS, MAX_INTERVAL_MS,
    MIN_INTERVAL_MS,
};
pub use result::{archive_file_name, ExtractionResult, ProcessVideoResponse};
