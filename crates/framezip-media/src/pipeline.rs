//! Frame extraction pipeline.
//!
//! Sequences path resolution, scratch workspace, extraction and archiving for
//! one request. The scratch workspace is released on every exit path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use framezip_models::{archive_file_name, ExtractionRequest, ExtractionResult, FrameFormat};
use tracing::{error, info, warn};

use crate::archive::Archiver;
use crate::error::{MediaError, MediaResult};
use crate::extractor::FrameExtractor;
use crate::path_guard;
use crate::workspace::{self, DEFAULT_WORKSPACE_PREFIX};

/// Lifecycle of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    WorkspaceAcquired,
    Extracting,
    Archiving,
    Completed,
    Failed,
    WorkspaceReleased,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Created => "created",
            PipelineState::WorkspaceAcquired => "workspace_acquired",
            PipelineState::Extracting => "extracting",
            PipelineState::Archiving => "archiving",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
            PipelineState::WorkspaceReleased => "workspace_released",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs state transitions for one run.
struct RunState<'a> {
    input: &'a str,
    state: PipelineState,
}

impl<'a> RunState<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            state: PipelineState::Created,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        info!(input = self.input, from = %self.state, to = %next, "Pipeline state changed");
        self.state = next;
    }
}

/// Turns a stored video into a ZIP of sampled frames.
pub struct FrameExtractionPipeline<E, A> {
    extractor: E,
    archiver: A,
    output_dir: PathBuf,
    scratch_root: PathBuf,
    workspace_prefix: String,
}

impl<E, A> FrameExtractionPipeline<E, A>
where
    E: FrameExtractor,
    A: Archiver,
{
    /// Create a pipeline writing archives into `output_dir` and using the
    /// system temp directory for scratch workspaces.
    pub fn new(extractor: E, archiver: A, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            archiver,
            output_dir: output_dir.into(),
            scratch_root: std::env::temp_dir(),
            workspace_prefix: DEFAULT_WORKSPACE_PREFIX.to_string(),
        }
    }

    /// Place scratch workspaces under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn with_workspace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.workspace_prefix = prefix.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Resolve an uploaded file name inside `input_dir` and run the pipeline.
    pub async fn run_upload(
        &self,
        input_dir: &Path,
        file_name: &str,
        interval_ms: u32,
        format: FrameFormat,
    ) -> MediaResult<ExtractionResult> {
        let source = path_guard::resolve(input_dir, file_name)?;
        let request = ExtractionRequest::new(source, interval_ms, format)
            .map_err(|_| MediaError::InvalidInterval(interval_ms))?;
        self.run(&request).await
    }

    /// Run one extraction end to end.
    ///
    /// On failure the original error is returned after the scratch workspace
    /// has been released.
    pub async fn run(&self, request: &ExtractionRequest) -> MediaResult<ExtractionResult> {
        let source = request.source_file_path();
        let input = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut state = RunState::new(&input);

        let size_bytes = match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                warn!(path = %source.display(), "Source video not found");
                return Err(MediaError::SourceNotFound(source.to_path_buf()));
            }
        };
        info!(
            input = %input,
            size_bytes,
            interval_ms = request.sample_interval_ms(),
            format = %request.frame_format(),
            "Starting frame extraction pipeline"
        );

        let workspace = workspace::acquire_in(&self.scratch_root, &self.workspace_prefix).await?;
        state.advance(PipelineState::WorkspaceAcquired);

        let started = Instant::now();
        let outcome = self
            .process(request, &input, workspace.path(), started, &mut state)
            .await;

        match &outcome {
            Ok(result) => {
                state.advance(PipelineState::Completed);
                info!(
                    input = %input,
                    frames = result.frame_count,
                    archive = %result.archive_file_path.display(),
                    elapsed_ms = result.elapsed_ms,
                    "Frame extraction pipeline completed"
                );
            }
            Err(e) => {
                state.advance(PipelineState::Failed);
                error!(
                    input = %input,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Frame extraction pipeline failed"
                );
            }
        }

        workspace.release().await;
        state.advance(PipelineState::WorkspaceReleased);

        outcome
    }

    async fn process(
        &self,
        request: &ExtractionRequest,
        input: &str,
        scratch: &Path,
        started: Instant,
        state: &mut RunState<'_>,
    ) -> MediaResult<ExtractionResult> {
        let source = request.source_file_path();
        let interval_ms = request.sample_interval_ms();
        let format = request.frame_format();

        state.advance(PipelineState::Extracting);
        let stage = Instant::now();
        let frames = self
            .extractor
            .extract(source, scratch, interval_ms, format)
            .await?;
        info!(
            frames = frames.len(),
            stage_ms = stage.elapsed().as_millis() as u64,
            "Extraction stage finished"
        );

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string());
        let archive_name = archive_file_name(&stem, interval_ms);
        workspace::ensure(&self.output_dir).await?;
        let archive_path = self.output_dir.join(&archive_name);

        state.advance(PipelineState::Archiving);
        let stage = Instant::now();
        let stats = self.archiver.archive(scratch, &archive_path).await?;
        info!(
            entries = stats.entries,
            bytes_written = stats.bytes_written,
            stage_ms = stage.elapsed().as_millis() as u64,
            "Archive stage finished"
        );

        Ok(ExtractionResult {
            success: true,
            input: input.to_string(),
            interval_ms,
            format,
            frame_count: frames.len(),
            archive_file_name: archive_name,
            archive_file_path: archive_path,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
