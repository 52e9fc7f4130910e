//! Extraction outcomes and their wire representation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::format::FrameFormat;

/// Suffix appended to the source stem when naming the archive.
pub const ARCHIVE_NAME_INFIX: &str = "_frames_interval_";

/// Build the archive file name for a source stem and interval.
///
/// The pattern `<stem>_frames_interval_<ms>ms.zip` is relied upon by
/// existing clients and must not change.
pub fn archive_file_name(stem: &str, interval_ms: u32) -> String {
    format!("{}{}{}ms.zip", stem, ARCHIVE_NAME_INFIX, interval_ms)
}

/// Result of a completed extraction pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    /// Stored input file name the request referred to
    pub input: String,
    pub interval_ms: u32,
    pub format: FrameFormat,
    pub frame_count: usize,
    pub archive_file_name: String,
    pub archive_file_path: PathBuf,
    pub elapsed_ms: u64,
}

/// JSON body returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoResponse {
    pub ok: bool,
    pub input: String,
    pub interval_ms: u32,
    pub format: FrameFormat,
    pub frames: usize,
    pub zip_file: String,
    pub zip_path: String,
    pub duration_ms: u64,
}

impl From<ExtractionResult> for ProcessVideoResponse {
    fn from(result: ExtractionResult) -> Self {
        Self {
            ok: result.success,
            input: result.input,
            interval_ms: result.interval_ms,
            format: result.format,
            frames: result.frame_count,
            zip_file: result.archive_file_name,
            zip_path: result.archive_file_path.to_string_lossy().into_owned(),
            duration_ms: result.elapsed_ms,
        }
    }
}
