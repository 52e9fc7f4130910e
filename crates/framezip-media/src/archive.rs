//! ZIP packaging of extracted frames.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{MediaError, MediaResult};

/// Highest Deflate level.
pub const MAX_COMPRESSION_LEVEL: i64 = 9;

/// Counters reported after an archive is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Number of file entries stored
    pub entries: usize,
    /// Size of the finished archive on disk
    pub bytes_written: u64,
}

/// Packs a directory into a single archive file.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive every file below `source_dir` into `destination`.
    ///
    /// Returns only once the archive is complete on disk.
    async fn archive(&self, source_dir: &Path, destination: &Path) -> MediaResult<ArchiveStats>;
}

#[async_trait]
impl<T: Archiver + ?Sized> Archiver for Box<T> {
    async fn archive(&self, source_dir: &Path, destination: &Path) -> MediaResult<ArchiveStats> {
        (**self).archive(source_dir, destination).await
    }
}

/// Deflate-compressed ZIP writer.
#[derive(Debug, Clone, Copy)]
pub struct ZipArchiver {
    compression_level: i64,
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self {
            compression_level: MAX_COMPRESSION_LEVEL,
        }
    }
}

impl ZipArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the Deflate level (clamped to 0..=9).
    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level.clamp(0, MAX_COMPRESSION_LEVEL);
        self
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, source_dir: &Path, destination: &Path) -> MediaResult<ArchiveStats> {
        let source_dir = source_dir.to_path_buf();
        let destination = destination.to_path_buf();
        let level = self.compression_level;

        tokio::task::spawn_blocking(move || write_zip(&source_dir, &destination, level))
            .await
            .map_err(|e| MediaError::archive(format!("archive task failed: {}", e)))?
    }
}

fn write_zip(source_dir: &Path, destination: &Path, level: i64) -> MediaResult<ArchiveStats> {
    let files = collect_files(source_dir).map_err(MediaError::archive)?;
    let stats = write_files(&files, destination, level)?;

    debug!(
        destination = %destination.display(),
        entries = stats.entries,
        bytes_written = stats.bytes_written,
        "Archive written"
    );

    Ok(stats)
}

/// Write `files` into a new archive at `destination`.
///
/// A failed write removes the partial archive, so `destination` either
/// holds a complete archive or does not exist.
fn write_files(files: &[(String, PathBuf)], destination: &Path, level: i64) -> MediaResult<ArchiveStats> {
    let file = File::create(destination).map_err(MediaError::archive)?;

    let result = write_entries(file, files, level);
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(destination) {
            warn!(destination = %destination.display(), error = %e, "Failed to remove partial archive");
        }
    }
    result
}

fn write_entries(file: File, files: &[(String, PathBuf)], level: i64) -> MediaResult<ArchiveStats> {
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level));

    for (relative, absolute) in files {
        writer
            .start_file(relative.as_str(), options)
            .map_err(MediaError::archive)?;
        let mut input = File::open(absolute).map_err(MediaError::archive)?;
        io::copy(&mut input, &mut writer).map_err(MediaError::archive)?;
    }

    let buffered = writer.finish().map_err(MediaError::archive)?;
    let file = buffered
        .into_inner()
        .map_err(|e| MediaError::archive(e.error()))?;
    file.sync_all().map_err(MediaError::archive)?;
    let bytes_written = file.metadata().map_err(MediaError::archive)?.len();

    Ok(ArchiveStats {
        entries: files.len(),
        bytes_written,
    })
}

/// Regular files below `root` as (`/`-separated relative name, absolute path),
/// sorted by name. A missing root yields nothing.
fn collect_files(root: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let relative = path
                    .strip_prefix(root)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push((relative, path));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
