//! Video processing handler.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use framezip_models::{ProcessParams, ProcessVideoResponse};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::upload;

/// `POST /videos/process`
///
/// Accepts a multipart form with a `file` part and optional `interval_ms`
/// and `format` text parts, and responds with the location of the frame
/// archive.
pub async fn process_video(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProcessVideoResponse>> {
    let request_id = request_id
        .map(|Extension(id)| id.0)
        .unwrap_or_default();
    let started = Instant::now();

    let form = upload::read_form(&mut multipart, &state.config.input_dir).await?;

    let Some(video) = form.file else {
        warn!(request_id = %request_id, "No video file provided");
        return Err(ApiError::bad_request("No video file provided"));
    };
    info!(
        request_id = %request_id,
        file = %video.file_name,
        original_name = %video.original_name,
        content_type = %video.content_type,
        size_bytes = video.size_bytes,
        "Upload received"
    );
    metrics::record_upload(video.size_bytes);

    let params = match ProcessParams::from_raw(form.interval_ms.as_deref(), form.format.as_deref()) {
        Ok(params) => params,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Rejected processing parameters");
            video.discard().await;
            return Err(e.into());
        }
    };
    info!(
        request_id = %request_id,
        interval_ms = params.interval_ms,
        format = %params.format,
        "Processing video"
    );

    let result = state
        .pipeline
        .run_upload(
            &state.config.input_dir,
            &video.file_name,
            params.interval_ms,
            params.format,
        )
        .await;

    match result {
        Ok(result) => {
            metrics::record_extraction_completed(
                params.format.as_str(),
                result.frame_count,
                result.elapsed_ms as f64 / 1000.0,
            );
            info!(
                request_id = %request_id,
                frames = result.frame_count,
                zip_file = %result.archive_file_name,
                duration_ms = started.elapsed().as_millis() as u64,
                "Video processed"
            );
            Ok(Json(ProcessVideoResponse::from(result)))
        }
        Err(e) => {
            metrics::record_extraction_failed(e.kind());
            error!(request_id = %request_id, error = %e, "Video processing failed");
            Err(ApiError::from(e))
        }
    }
}
