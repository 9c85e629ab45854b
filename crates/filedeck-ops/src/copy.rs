//! Recursive copy and move primitives.
//!
//! These run on blocking threads; progress is reported through the
//! `on_file` callback once per file written.

use std::fs;
use std::path::Path;

use filedeck_core::{EngineError, Result};

use crate::naming::occupied;

/// Copy `source` to `dest`, descending directories depth-first.
///
/// Destination directories are created before their children. Symlinks
/// are recreated rather than followed on unix. `on_file` is called after
/// each non-directory entry has been fully written.
pub fn copy_recursive(source: &Path, dest: &Path, on_file: &mut dyn FnMut(&Path)) -> Result<()> {
    let metadata = fs::symlink_metadata(source).map_err(|e| EngineError::io(source, e))?;

    if metadata.is_dir() {
        fs::create_dir(dest).map_err(|e| EngineError::io(dest, e))?;

        let mut entries = fs::read_dir(source)
            .map_err(|e| EngineError::io(source, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| EngineError::io(source, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            copy_recursive(&entry.path(), &dest.join(entry.file_name()), on_file)?;
        }
        return Ok(());
    }

    copy_leaf(source, dest, &metadata)?;
    on_file(source);
    Ok(())
}

#[cfg(unix)]
fn copy_leaf(source: &Path, dest: &Path, metadata: &fs::Metadata) -> Result<()> {
    if metadata.file_type().is_symlink() {
        let target = fs::read_link(source).map_err(|e| EngineError::io(source, e))?;
        std::os::unix::fs::symlink(target, dest).map_err(|e| EngineError::io(dest, e))?;
        return Ok(());
    }
    fs::copy(source, dest).map_err(|e| EngineError::io(dest, e))?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_leaf(source: &Path, dest: &Path, _metadata: &fs::Metadata) -> Result<()> {
    fs::copy(source, dest).map_err(|e| EngineError::io(dest, e))?;
    Ok(())
}

/// Remove a file or directory tree.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| EngineError::io(path, e))?;
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| EngineError::io(path, e))
}

/// Move `source` to `dest` with a plain rename.
///
/// Fails with an error for which [`EngineError::is_cross_device`] holds
/// when the two paths are on different filesystems.
pub fn rename_path(source: &Path, dest: &Path) -> Result<()> {
    fs::rename(source, dest).map_err(|e| EngineError::io(source, e))
}

/// Copy `source` to `dest`, then remove `source`.
///
/// If the copy fails the partial destination is removed and `source` is
/// left untouched.
pub fn copy_then_remove(source: &Path, dest: &Path, on_file: &mut dyn FnMut(&Path)) -> Result<()> {
    if occupied(dest) {
        return Err(EngineError::AlreadyExists {
            path: dest.to_path_buf(),
        });
    }
    if let Err(e) = copy_recursive(source, dest, on_file) {
        if occupied(dest) {
            if let Err(cleanup) = remove_path(dest) {
                tracing::warn!(target: "filedeck::ops", path = %dest.display(), error = %cleanup, "failed to clean up partial copy");
            }
        }
        return Err(e);
    }
    remove_path(source)
}
