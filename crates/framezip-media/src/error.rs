//! Error types for media operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while extracting and packaging frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid file path: {0}")]
    PathTraversal(String),

    #[error("Video file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Decoding tool not found or not executable: {0}")]
    ToolNotFound(String),

    #[error("{message}")]
    ToolFailed {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Sampling interval must be positive, got {0}ms")]
    InvalidInterval(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a tool failure error from the process exit status.
    ///
    /// The message reads `<tool> exited with code <n>` followed by the
    /// captured stderr on the next line.
    pub fn tool_failed(tool: &str, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        let code = exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none (terminated by signal)".to_string());
        let message = if stderr.trim().is_empty() {
            format!("{} exited with code {}", tool, code)
        } else {
            format!("{} exited with code {}\n{}", tool, code, stderr.trim_end())
        };

        Self::ToolFailed {
            message,
            stderr,
            exit_code,
        }
    }

    /// Create a path traversal error.
    pub fn path_traversal(detail: impl Into<String>) -> Self {
        Self::PathTraversal(detail.into())
    }

    /// Create an archive error from any displayable cause.
    pub fn archive(cause: impl std::fmt::Display) -> Self {
        Self::Archive(cause.to_string())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable short name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PathTraversal(_) => "path_traversal",
            Self::SourceNotFound(_) => "source_not_found",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::ToolFailed { .. } => "tool_failed",
            Self::Archive(_) => "archive",
            Self::Timeout(_) => "timeout",
            Self::InvalidInterval(_) => "invalid_interval",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the error was caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::PathTraversal(_) | Self::SourceNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_message() {
        let err = MediaError::tool_failed("ffmpeg", Some(1), "Invalid input\n");
        assert_eq!(err.to_string(), "ffmpeg exited with code 1\nInvalid input");

        match err {
            MediaError::ToolFailed { stderr, exit_code, .. } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr, "Invalid input\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tool_failed_without_code() {
        let err = MediaError::tool_failed("ffmpeg", None, "");
        assert!(err.to_string().starts_with("ffmpeg exited with code none"));
    }

    #[test]
    fn test_client_errors() {
        assert!(MediaError::path_traversal("../x").is_client_error());
        assert!(MediaError::SourceNotFound(PathBuf::from("/in/x.mp4")).is_client_error());
        assert!(!MediaError::archive("disk full").is_client_error());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(MediaError::Timeout(Duration::from_secs(5)).kind(), "timeout");
        assert_eq!(MediaError::tool_failed("ffmpeg", Some(1), "").kind(), "tool_failed");
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_deadline() {
        let err = MediaError::Timeout(Duration::from_millis(500));
        assert_eq!(err.to_string(), "Operation timed out after 500ms");
    }
}
