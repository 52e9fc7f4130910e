//! Extraction requests and caller-facing parameter validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::FrameFormat;

/// Interval used when the caller does not send one.
pub const DEFAULT_INTERVAL_MS: u32 = 1000;
/// Smallest interval accepted at the request boundary.
pub const MIN_INTERVAL_MS: u32 = 100;
/// Largest interval accepted at the request boundary.
pub const MAX_INTERVAL_MS: u32 = 60_000;

/// Errors raised while building or validating a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("interval_ms must be greater than zero")]
    ZeroInterval,

    #[error("interval_ms must be between {} and {}", MIN_INTERVAL_MS, MAX_INTERVAL_MS)]
    IntervalOutOfRange(u32),

    #[error("interval_ms must be an integer, got {0:?}")]
    InvalidInterval(String),

    #[error("{0}")]
    InvalidFormat(String),
}

/// A single frame extraction job.
///
/// The source path is expected to be already resolved against the input
/// root. Fields are private so a request cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    source_file_path: PathBuf,
    sample_interval_ms: u32,
    frame_format: FrameFormat,
}

impl ExtractionRequest {
    /// Build a request. Only a zero interval is rejected here; the
    /// operational range is enforced by [`ProcessParams`].
    pub fn new(
        source_file_path: impl Into<PathBuf>,
        sample_interval_ms: u32,
        frame_format: FrameFormat,
    ) -> Result<Self, RequestError> {
        if sample_interval_ms == 0 {
            return Err(RequestError::ZeroInterval);
        }

        Ok(Self {
            source_file_path: source_file_path.into(),
            sample_interval_ms,
            frame_format,
        })
    }

    pub fn source_file_path(&self) -> &Path {
        &self.source_file_path
    }

    pub fn sample_interval_ms(&self) -> u32 {
        self.sample_interval_ms
    }

    pub fn frame_format(&self) -> FrameFormat {
        self.frame_format
    }
}

/// Sampling parameters as submitted by a client, validated once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessParams {
    pub interval_ms: u32,
    pub format: FrameFormat,
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            format: FrameFormat::default(),
        }
    }
}

impl ProcessParams {
    /// Parse raw form values. Missing or blank values fall back to defaults.
    pub fn from_raw(interval_ms: Option<&str>, format: Option<&str>) -> Result<Self, RequestError> {
        let interval_ms = match interval_ms.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| RequestError::InvalidInterval(raw.to_string()))?,
            None => DEFAULT_INTERVAL_MS,
        };

        let format = match format.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<FrameFormat>()
                .map_err(|e| RequestError::InvalidFormat(e.to_string()))?,
            None => FrameFormat::default(),
        };

        let params = Self { interval_ms, format };
        params.validate()?;
        Ok(params)
    }

    /// Check the interval against the operational range.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&self.interval_ms) {
            return Err(RequestError::IntervalOutOfRange(self.interval_ms));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_zero_interval() {
        let err = ExtractionRequest::new("/in/clip.mp4", 0, FrameFormat::Jpg).unwrap_err();
        assert_eq!(err, RequestError::ZeroInterval);
    }

    #[test]
    fn test_request_accepts_any_positive_interval() {
        let request = ExtractionRequest::new("/in/clip.mp4", 7, FrameFormat::Png).unwrap();
        assert_eq!(request.sample_interval_ms(), 7);
        assert_eq!(request.frame_format(), FrameFormat::Png);
        assert_eq!(request.source_file_path(), Path::new("/in/clip.mp4"));
    }

    #[test]
    fn test_params_defaults() {
        let params = ProcessParams::from_raw(None, None).unwrap();
        assert_eq!(params, ProcessParams::default());

        let params = ProcessParams::from_raw(Some(""), Some("  ")).unwrap();
        assert_eq!(params.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(params.format, FrameFormat::Jpg);
    }

    #[test]
    fn test_params_bounds_are_inclusive() {
        assert!(ProcessParams::from_raw(Some("100"), None).is_ok());
        assert!(ProcessParams::from_raw(Some("60000"), None).is_ok());
        assert_eq!(
            ProcessParams::from_raw(Some("99"), None).unwrap_err(),
            RequestError::IntervalOutOfRange(99)
        );
        assert_eq!(
            ProcessParams::from_raw(Some("60001"), None).unwrap_err(),
            RequestError::IntervalOutOfRange(60001)
        );
    }

    #[test]
    fn test_params_reject_non_numeric_interval() {
        let err = ProcessParams::from_raw(Some("abc"), None).unwrap_err();
        assert!(matches!(err, RequestError::InvalidInterval(_)));
        assert!(ProcessParams::from_raw(Some("-5"), None).is_err());
    }

    #[test]
    fn test_params_format_is_normalized() {
        let params = ProcessParams::from_raw(Some("500"), Some("PNG")).unwrap();
        assert_eq!(params.format, FrameFormat::Png);
        assert!(ProcessParams::from_raw(None, Some("bmp")).is_err());
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ProcessParams::from_raw(Some("50"), None).unwrap_err();
        assert_eq!(err.to_string(), "interval_ms must be between 100 and 60000");
    }
}
