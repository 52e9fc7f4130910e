//! Frame extraction through the external decoding tool.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use framezip_models::FrameFormat;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// File name prefix of every frame the decoder writes.
pub const FRAME_PREFIX: &str = "img";

/// Ordered frame file names, lexicographic (which is capture order).
pub type FrameSet = Vec<String>;

/// Extracts sampled frames from a video into a directory.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write one frame per `sample_interval_ms` of video into `output_dir`
    /// and return the produced file names in capture order.
    async fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        sample_interval_ms: u32,
        format: FrameFormat,
    ) -> MediaResult<FrameSet>;
}

#[async_trait]
impl<T: FrameExtractor + ?Sized> FrameExtractor for Box<T> {
    async fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        sample_interval_ms: u32,
        format: FrameFormat,
    ) -> MediaResult<FrameSet> {
        (**self)
            .extract(input_path, output_dir, sample_interval_ms, format)
            .await
    }
}

/// Exact sampling rate `1000 / interval_ms` frames per second, in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    numerator: u32,
    denominator: u32,
}

impl FrameRate {
    pub fn from_interval_ms(interval_ms: u32) -> MediaResult<Self> {
        if interval_ms == 0 {
            return Err(MediaError::InvalidInterval(interval_ms));
        }

        let divisor = gcd(1000, interval_ms);
        Ok(Self {
            numerator: 1000 / divisor,
            denominator: interval_ms / divisor,
        })
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// The `-vf` filter expression for this rate.
    pub fn filter(&self) -> String {
        format!("fps={}", self)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Numbered output pattern: `img_00001.<ext>`, `img_00002.<ext>`, ...
pub fn frame_pattern(output_dir: &Path, format: FrameFormat) -> PathBuf {
    output_dir.join(format!("{}_%05d.{}", FRAME_PREFIX, format.extension()))
}

/// Build the decoder invocation for one extraction.
pub fn build_extract_command(
    input_path: &Path,
    output_dir: &Path,
    rate: FrameRate,
    format: FrameFormat,
) -> FfmpegCommand {
    FfmpegCommand::new(input_path, frame_pattern(output_dir, format))
        .log_level("error")
        .video_filter(rate.filter())
}

/// List the frames in `dir` for `format`, sorted by name.
pub async fn list_frames(dir: &Path, format: FrameFormat) -> MediaResult<FrameSet> {
    let suffix = format!(".{}", format.extension());
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    let mut total = 0usize;

    while let Some(entry) = entries.next_entry().await? {
        total += 1;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(FRAME_PREFIX) && name.ends_with(&suffix) {
            frames.push(name);
        }
    }

    frames.sort();
    debug!(dir = %dir.display(), total, matched = frames.len(), "Listed frame files");
    Ok(frames)
}

/// [`FrameExtractor`] backed by an FFmpeg-compatible CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameExtractor {
    runner: FfmpegRunner,
}

impl FfmpegFrameExtractor {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &FfmpegRunner {
        &self.runner
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        sample_interval_ms: u32,
        format: FrameFormat,
    ) -> MediaResult<FrameSet> {
        let rate = FrameRate::from_interval_ms(sample_interval_ms)?;
        info!(
            input = %input_path.display(),
            output_dir = %output_dir.display(),
            interval_ms = sample_interval_ms,
            fps = %rate,
            fps_value = rate.as_f64(),
            format = %format,
            "Extracting frames"
        );

        let cmd = build_extract_command(input_path, output_dir, rate, format);
        let output = self.runner.run(&cmd).await?;

        let frames = list_frames(output_dir, format).await?;
        info!(
            frames = frames.len(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "Frame extraction finished"
        );
        Ok(frames)
    }
}
