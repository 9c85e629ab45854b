//! File counting and volume detection.

use std::fs;
use std::path::{Path, PathBuf};

use filedeck_core::{EngineError, Result};

/// Count the files under `path`, recursively.
///
/// Directories themselves are not counted; anything else (regular files,
/// symlinks, special files) counts as one. A missing `path` is an error.
/// Unreadable subdirectories are skipped, so the result may under-count.
pub fn count_files(path: &Path) -> Result<usize> {
    let metadata = fs::symlink_metadata(path).map_err(|e| EngineError::io(path, e))?;
    if metadata.is_dir() {
        Ok(count_dir_files(path))
    } else {
        Ok(1)
    }
}

fn count_dir_files(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| match entry.file_type() {
            Ok(t) if t.is_dir() => count_dir_files(&entry.path()),
            _ => 1,
        })
        .sum()
}

/// Sum `count_files` over a batch, skipping items that cannot be counted.
///
/// Returns the per-item counts alongside the total so handlers can advance
/// by a whole item at once when it is moved without copying.
pub fn count_batch(items: &[PathBuf]) -> (Vec<usize>, usize) {
    let counts: Vec<usize> = items
        .iter()
        .map(|item| match count_files(item) {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(target: "filedeck::ops", path = %item.display(), error = %e, "skipping item while counting");
                0
            }
        })
        .collect();
    let total = counts.iter().sum();
    (counts, total)
}

/// Whether `path` lives on a different volume than `trash_root`.
///
/// A path under one of the mount `prefixes` is external unless the trash
/// root sits under the same prefix. Otherwise device ids are compared on
/// unix; elsewhere the prefix check is all there is.
pub fn is_external_volume(path: &Path, trash_root: &Path, prefixes: &[PathBuf]) -> bool {
    if let Some(prefix) = prefixes.iter().find(|prefix| path.starts_with(prefix)) {
        return !trash_root.starts_with(prefix);
    }

    #[cfg(unix)]
    {
        if let (Some(a), Some(b)) = (device_of(path), device_of(trash_root)) {
            return a != b;
        }
    }

    false
}

/// Device id of the nearest existing ancestor of `path`.
#[cfg(unix)]
fn device_of(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;

    path.ancestors()
        .find_map(|p| fs::metadata(p).ok())
        .map(|m| m.dev())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_files_recursive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("top.txt"), "1").unwrap();
        fs::write(dir.path().join("a/one.txt"), "1").unwrap();
        fs::write(dir.path().join("a/b/two.txt"), "1").unwrap();
        fs::write(dir.path().join("a/b/c/three.txt"), "1").unwrap();

        assert_eq!(count_files(dir.path()).unwrap(), 4);
        assert_eq!(count_files(&dir.path().join("top.txt")).unwrap(), 1);
        assert_eq!(count_files(&dir.path().join("a/b/c")).unwrap(), 1);
    }

    #[test]
    fn test_count_files_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(count_files(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_count_files_missing() {
        let dir = TempDir::new().unwrap();
        let err = count_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_count_batch_skips_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "1").unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("d/x"), "1").unwrap();
        fs::write(dir.path().join("d/y"), "1").unwrap();

        let items = vec![
            dir.path().join("a"),
            dir.path().join("missing"),
            dir.path().join("d"),
        ];
        let (counts, total) = count_batch(&items);
        assert_eq!(counts, vec![1, 0, 2]);
        assert_eq!(total, 3);
    }

    #[test]
    fn test_same_device_is_not_external() {
        let dir = TempDir::new().unwrap();
        let trash = dir.path().join("Trash");
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(!is_external_volume(&file, &trash, &[]));
    }

    #[test]
    fn test_mount_prefix_marks_external() {
        let dir = TempDir::new().unwrap();
        let mounts = dir.path().join("media");
        let usb = mounts.join("usb/photos");
        fs::create_dir_all(&usb).unwrap();
        let prefixes = vec![mounts.clone()];

        assert!(is_external_volume(&usb, &dir.path().join("Trash"), &prefixes));
        assert!(!is_external_volume(&usb, &mounts.join("usb/.Trash"), &prefixes));
        assert!(!is_external_volume(dir.path(), &dir.path().join("Trash"), &prefixes));
    }
}
