//! FFmpeg CLI frame extraction and ZIP packaging.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with deadline support
//! - Path resolution that keeps user-supplied names inside a base directory
//! - Request-scoped scratch workspaces with guaranteed cleanup
//! - Frame sampling at an exact rational frame rate
//! - Deflate ZIP packaging of extracted frames
//! - The pipeline that sequences all of the above

pub mod archive;
pub mod command;
pub mod error;
pub mod extractor;
pub mod path_guard;
pub mod pipeline;
pub mod workspace;

pub use archive::{ArchiveStats, Archiver, ZipArchiver};
pub use command::{FfmpegCommand, FfmpegRunner, ToolOutput};
pub use error::{MediaError, MediaResult};
pub use extractor::{FfmpegFrameExtractor, FrameExtractor, FrameRate, FrameSet};
pub use pipeline::{FrameExtractionPipeline, PipelineState};
pub use workspace::ScratchWorkspace;
