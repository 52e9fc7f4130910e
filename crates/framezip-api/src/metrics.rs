//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "framezip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "framezip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "framezip_http_requests_in_flight";

    // Upload metrics
    pub const UPLOAD_BYTES_TOTAL: &str = "framezip_upload_bytes_total";

    // Processing metrics
    pub const EXTRACTIONS_COMPLETED_TOTAL: &str = "framezip_extractions_completed_total";
    pub const EXTRACTIONS_FAILED_TOTAL: &str = "framezip_extractions_failed_total";
    pub const EXTRACTION_DURATION_SECONDS: &str = "framezip_extraction_duration_seconds";
    pub const FRAMES_EXTRACTED_TOTAL: &str = "framezip_frames_extracted_total";
}

/// Label used for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record bytes received for a stored upload.
pub fn record_upload(bytes: u64) {
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

/// Record a successful pipeline run.
pub fn record_extraction_completed(format: &str, frames: usize, duration_secs: f64) {
    let labels = [("format", format.to_string())];
    counter!(names::EXTRACTIONS_COMPLETED_TOTAL, &labels).increment(1);
    counter!(names::FRAMES_EXTRACTED_TOTAL, &labels).increment(frames as u64);
    histogram!(names::EXTRACTION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed pipeline run.
pub fn record_extraction_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::EXTRACTIONS_FAILED_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Paths are labelled by route template so client-chosen URLs cannot grow
/// label cardinality.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
