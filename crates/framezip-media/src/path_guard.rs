//! Resolution of user-supplied file names against a base directory.
//!
//! This is the only barrier between a client-controlled file name and the
//! filesystem, so both relative traversal (`../../etc/passwd`) and absolute
//! paths (`/etc/passwd`) must be rejected.

use std::path::{Component, Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Resolve `user_file_name` inside `base_dir`.
///
/// The result is an absolute, lexically normalized path that lies strictly
/// below `base_dir`. The base directory itself is not an acceptable result.
/// No filesystem access happens besides reading the current directory when
/// `base_dir` is relative.
pub fn resolve(base_dir: impl AsRef<Path>, user_file_name: &str) -> MediaResult<PathBuf> {
    if user_file_name.contains('\0') {
        return Err(MediaError::path_traversal("file name contains a NUL byte"));
    }

    let base = normalize(&absolute(base_dir.as_ref())?);
    let candidate = normalize(&base.join(user_file_name));

    if candidate == base || !candidate.starts_with(&base) {
        tracing::warn!(
            base = %base.display(),
            file_name = %user_file_name,
            "Rejected file name outside of base directory"
        );
        return Err(MediaError::path_traversal(user_file_name));
    }

    Ok(candidate)
}

fn absolute(path: &Path) -> MediaResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Lexical normalization: drops `.`, resolves `..` against the preceding
/// component, never climbs above the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
