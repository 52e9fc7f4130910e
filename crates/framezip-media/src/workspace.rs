//! Request-scoped scratch directories.
//!
//! Each pipeline run owns exactly one [`ScratchWorkspace`]. The directory is
//! removed by [`ScratchWorkspace::release`], or by `Drop` when the owning
//! future is cancelled or panics before reaching the release call.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::MediaResult;

/// Prefix used for frame extraction workspaces.
pub const DEFAULT_WORKSPACE_PREFIX: &str = "frames-";

/// An exclusively owned temporary directory.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    released: bool,
}

impl ScratchWorkspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory. Errors are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        release(&self.path).await;
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        warn!(path = %self.path.display(), "Scratch workspace dropped without release, removing");
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove scratch workspace"),
        }
    }
}

/// Create a uniquely named directory under the system temp root.
pub async fn acquire(prefix: &str) -> MediaResult<ScratchWorkspace> {
    acquire_in(&std::env::temp_dir(), prefix).await
}

/// Create a uniquely named directory under `root`.
pub async fn acquire_in(root: &Path, prefix: &str) -> MediaResult<ScratchWorkspace> {
    ensure(root).await?;

    let path = root.join(format!("{}{}", prefix, Uuid::new_v4().simple()));
    // create_dir (not create_dir_all) so a name collision is an error
    fs::create_dir(&path).await?;

    debug!(path = %path.display(), "Scratch workspace created");
    Ok(ScratchWorkspace {
        path,
        released: false,
    })
}

/// Recursively delete `path`.
///
/// A missing path is a no-op and deletion failures are only logged, so
/// cleanup never hides the error that ended the pipeline.
pub async fn release(path: &Path) {
    match fs::remove_dir_all(path).await {
        Ok(()) => debug!(path = %path.display(), "Scratch workspace removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Scratch workspace already gone");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch workspace"),
    }
}

/// Create `path` and any missing parents.
pub async fn ensure(path: &Path) -> MediaResult<()> {
    fs::create_dir_all(path).await?;
    Ok(())
}
