//! Multipart upload intake.
//!
//! The video part is streamed to the input directory under a unique name;
//! the text parts are returned raw for [`ProcessParams`] to validate.
//!
//! [`ProcessParams`]: framezip_models::ProcessParams

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Form field carrying the video.
pub const FILE_FIELD: &str = "file";
pub const INTERVAL_FIELD: &str = "interval_ms";
pub const FORMAT_FIELD: &str = "format";

/// Content types accepted for the video part.
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "video/mp4",
    "video/avi",
    "video/mkv",
    "video/webm",
    "video/quicktime",
];

pub fn is_allowed_mime(content_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&content_type.trim().to_lowercase().as_str())
}

/// A video written to the input directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Name under the input directory, handed to the pipeline
    pub file_name: String,
    pub path: PathBuf,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl StoredUpload {
    /// Remove the stored file. Failures are logged only.
    pub async fn discard(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to remove stored upload");
        }
    }
}

/// The parsed form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<StoredUpload>,
    pub interval_ms: Option<String>,
    pub format: Option<String>,
}

/// Build `<name>-<unix_millis>-<random><.ext>` from a client file name.
///
/// Directory components the client may have sent are dropped.
pub fn stored_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = Path::new(&base);

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = Uuid::new_v4().as_u128() % 1_000_000_000;

    format!("{}-{}-{}{}", stem, millis, random, ext)
}

/// Read every part of the form, storing the video part in `input_dir`.
///
/// If anything fails after the video was stored, the file is removed before
/// the error is returned.
pub async fn read_form(multipart: &mut Multipart, input_dir: &Path) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    let outcome = read_fields(multipart, input_dir, &mut form).await;
    if let Err(e) = outcome {
        if let Some(upload) = form.file.take() {
            upload.discard().await;
        }
        return Err(e);
    }

    Ok(form)
}

async fn read_fields(multipart: &mut Multipart, input_dir: &Path, form: &mut UploadForm) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD => {
                if form.file.is_some() {
                    return Err(ApiError::bad_request("Only one video file may be uploaded"));
                }
                form.file = Some(store_video(field, input_dir).await?);
            }
            INTERVAL_FIELD => form.interval_ms = Some(field.text().await?),
            FORMAT_FIELD => form.format = Some(field.text().await?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(())
}

async fn store_video(mut field: Field<'_>, input_dir: &Path) -> ApiResult<StoredUpload> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !is_allowed_mime(&content_type) {
        let shown = if content_type.is_empty() { "unknown" } else { content_type.as_str() };
        return Err(ApiError::bad_request(format!(
            "Invalid file type: {}. Only video files are allowed.",
            shown
        )));
    }

    let original_name = field.file_name().unwrap_or_default().to_string();
    let file_name = stored_file_name(&original_name);
    let path = input_dir.join(&file_name);

    let written = async {
        let mut file = BufWriter::new(File::create(&path).await?);
        let mut size_bytes = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size_bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<_, ApiError>(size_bytes)
    }
    .await;

    match written {
        Ok(size_bytes) => {
            debug!(file = %file_name, size_bytes, "Stored upload");
            Ok(StoredUpload {
                file_name,
                path,
                original_name,
                content_type,
                size_bytes,
            })
        }
        Err(e) => {
            // partial writes must not linger in the input directory
            let _ = tokio::fs::remove_file(&path).await;
            Err(e)
        }
    }
}
