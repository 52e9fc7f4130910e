//! API integration tests.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use framezip_api::{create_router, ApiConfig, AppState};

const BOUNDARY: &str = "framezip-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn video(data: &[u8]) -> Part<'_> {
    Part::File {
        name: "file",
        file_name: "clip.mp4",
        content_type: "video/mp4",
        data,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn process_request(parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method("POST")
        .uri("/videos/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

/// Directories owned by one test app.
struct TestEnv {
    input: TempDir,
    output: TempDir,
    scratch: TempDir,
    _bin: TempDir,
    ffmpeg: PathBuf,
}

impl TestEnv {
    fn new(ffmpeg_script: &str) -> Self {
        let bin = TempDir::new().unwrap();
        let ffmpeg = write_script(bin.path(), ffmpeg_script);
        Self {
            input: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
            _bin: bin,
            ffmpeg,
        }
    }

    fn config(&self) -> ApiConfig {
        ApiConfig {
            input_dir: self.input.path().to_path_buf(),
            output_dir: self.output.path().to_path_buf(),
            scratch_dir: self.scratch.path().to_path_buf(),
            ffmpeg_path: self.ffmpeg.to_string_lossy().into_owned(),
            metrics_enabled: false,
            ..Default::default()
        }
    }

    async fn router(&self) -> Router {
        self.router_with(self.config()).await
    }

    async fn router_with(&self, config: ApiConfig) -> Router {
        let state = AppState::new(config).await.unwrap();
        create_router(state, None)
    }

    fn count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }
}

#[cfg(unix)]
fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(not(unix))]
fn write_script(dir: &Path, _body: &str) -> PathBuf {
    dir.join("fake-ffmpeg")
}

/// Writes ten numbered frames next to the output pattern.
const TEN_FRAMES: &str = r#"for last; do :; done
dir=$(dirname "$last")
ext="${last##*.}"
i=1
while [ $i -le 10 ]; do
  printf frame > "$dir/img_$(printf %05d $i).$ext"
  i=$((i+1))
done"#;

const FAILS: &str = "echo 'Invalid data found when processing input' >&2\nexit 1";

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

/// Metrics are not routed when disabled.
#[tokio::test]
async fn test_metrics_endpoint_disabled() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_missing_file_is_bad_request() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(process_request(&[Part::Text("interval_ms", "1000")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No video file provided");
}

#[tokio::test]
async fn test_invalid_mime_type_is_rejected() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(process_request(&[Part::File {
            name: "file",
            file_name: "photo.png",
            content_type: "image/png",
            data: b"png",
        }]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("Invalid file type: image/png"), "got {error}");
    assert_eq!(TestEnv::count(env.input.path()), 0);
}

#[tokio::test]
async fn test_interval_out_of_range_is_rejected_and_upload_removed() {
    let env = TestEnv::new(TEN_FRAMES);

    for interval in ["50", "60001"] {
        let app = env.router().await;
        let response = app
            .oneshot(process_request(&[
                video(b"video"),
                Part::Text("interval_ms", interval),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "interval_ms must be between 100 and 60000"
        );
    }

    assert_eq!(TestEnv::count(env.input.path()), 0);
    assert_eq!(TestEnv::count(env.output.path()), 0);
}

#[tokio::test]
async fn test_non_numeric_interval_and_unknown_format_are_rejected() {
    let env = TestEnv::new(TEN_FRAMES);

    let app = env.router().await;
    let response = app
        .oneshot(process_request(&[
            video(b"video"),
            Part::Text("interval_ms", "fast"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = env.router().await;
    let response = app
        .oneshot(process_request(&[video(b"video"), Part::Text("format", "gif")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("gif"), "got {error}");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let env = TestEnv::new(TEN_FRAMES);
    let config = ApiConfig {
        max_body_size: 1024,
        ..env.config()
    };
    let app = env.router_with(config).await;

    let data = vec![0u8; 4096];
    let response = app.oneshot(process_request(&[video(&data)])).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_video_end_to_end() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(process_request(&[
            Part::Text("interval_ms", "1000"),
            Part::Text("format", "JPG"),
            video(b"not really a video"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;

    assert_eq!(body["ok"], true);
    assert_eq!(body["frames"], 10);
    assert_eq!(body["intervalMs"], 1000);
    assert_eq!(body["format"], "jpg");
    assert!(body["durationMs"].is_u64());

    let input = body["input"].as_str().unwrap();
    assert!(input.starts_with("clip-") && input.ends_with(".mp4"), "got {input}");
    let zip_file = body["zipFile"].as_str().unwrap();
    assert_eq!(
        zip_file,
        format!("{}_frames_interval_1000ms.zip", input.trim_end_matches(".mp4"))
    );

    let zip_path = PathBuf::from(body["zipPath"].as_str().unwrap());
    assert_eq!(zip_path, env.output.path().join(zip_file));
    let archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 10);

    assert!(env.input.path().join(input).exists());
    assert_eq!(TestEnv::count(env.scratch.path()), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_png_format_defaults_interval() {
    let env = TestEnv::new(TEN_FRAMES);
    let app = env.router().await;

    let response = app
        .oneshot(process_request(&[video(b"video"), Part::Text("format", "png")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["format"], "png");
    assert_eq!(body["intervalMs"], 1000);
    assert_eq!(body["frames"], 10);
}

#[cfg(unix)]
#[tokio::test]
async fn test_tool_failure_is_server_error_and_cleans_up() {
    let env = TestEnv::new(FAILS);
    let app = env.router().await;

    let response = app
        .oneshot(process_request(&[video(b"video")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("exited with code 1"), "got {error}");

    assert_eq!(TestEnv::count(env.scratch.path()), 0);
    assert_eq!(TestEnv::count(env.output.path()), 0);
}
