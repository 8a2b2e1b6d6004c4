//! Filesystem helpers for container network files.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use krug_common::{KrugError, KrugResult};

/// Mode for generated network files.
pub const NETWORK_FILE_MODE: u32 = 0o644;

/// Resolve `path` beneath `rootfs`, rejecting traversal outside it.
///
/// The resolution is lexical: leading roots and `.` components are ignored,
/// and `..` components pop previously pushed ones but may never climb above
/// the rootfs.
///
/// # Errors
///
/// Returns [`KrugError::UnsafePath`] if the path would escape the rootfs.
pub fn scoped_join(rootfs: &Path, path: &str) -> KrugResult<PathBuf> {
    let mut resolved = rootfs.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(path).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(KrugError::UnsafePath {
                        path: path.to_string(),
                    });
                }
                depth -= 1;
                resolved.pop();
            }
            Component::Normal(name) => {
                depth += 1;
                resolved.push(name);
            }
        }
    }

    Ok(resolved)
}

/// Whether a path exists.
#[must_use]
pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

/// Read a file's full content, treating a missing file as empty.
///
/// # Errors
///
/// Returns an error for any I/O failure other than the file being absent.
pub fn read_or_empty(path: &Path) -> KrugResult<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

/// Write full file content with the given mode, creating parent directories.
///
/// # Errors
///
/// Returns an error if directory creation or the write fails.
pub fn write_file(path: &Path, content: &str, mode: u32) -> KrugResult<()> {
    use std::os::unix::fs::OpenOptionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    file.write_all(content.as_bytes())?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote network file");
    Ok(())
}

/// Copy a file's content to `dst` with the given mode.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the destination written.
pub fn copy_file(src: &Path, dst: &Path, mode: u32) -> KrugResult<()> {
    let content = std::fs::read_to_string(src)?;
    write_file(dst, &content, mode)
}
