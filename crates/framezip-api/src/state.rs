//! Application state.

use std::sync::Arc;

use framezip_media::{workspace, FfmpegFrameExtractor, FfmpegRunner, FrameExtractionPipeline, ZipArchiver};
use tracing::{info, warn};

use crate::config::ApiConfig;

/// The concrete pipeline served by the API.
pub type VideoPipeline = FrameExtractionPipeline<FfmpegFrameExtractor, ZipArchiver>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub pipeline: Arc<VideoPipeline>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Creates the input, output and scratch directories. A missing decoding tool is
    /// only logged here; requests fail with a clear error until it appears.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        workspace::ensure(&config.input_dir).await?;
        workspace::ensure(&config.output_dir).await?;
        workspace::ensure(&config.scratch_dir).await?;

        let mut runner = FfmpegRunner::new().with_program(&config.ffmpeg_path);
        if let Some(timeout) = config.ffmpeg_timeout {
            runner = runner.with_timeout(timeout);
        }

        match runner.resolve_program() {
            Ok(path) => info!(ffmpeg = %path.display(), "Decoding tool found"),
            Err(e) => warn!(error = %e, "Decoding tool not available"),
        }

        let pipeline = FrameExtractionPipeline::new(
            FfmpegFrameExtractor::new(runner),
            ZipArchiver::new(),
            config.output_dir.clone(),
        )
        .with_scratch_root(config.scratch_dir.clone());

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }
}
