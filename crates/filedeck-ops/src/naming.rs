//! Collision-free naming and file name validation.

use std::fs;
use std::path::{Path, PathBuf};

use filedeck_core::{EngineError, Result};

/// Probe limit used when the parent directory cannot be listed.
const MAX_PROBES: usize = 10_000;

/// Whether anything (including a dangling symlink) occupies `path`.
pub(crate) fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Build the `n`th disambiguated variant of `path`.
///
/// For "file.txt" this is "file (n).txt"; for "dir" it is "dir (n)".
pub fn disambiguate(path: &Path, n: usize) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let new_name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    };

    parent.join(new_name)
}

/// Return `candidate` if nothing exists there, else the first free
/// " (n)" variant.
///
/// The search is bounded by the number of entries in the parent
/// directory: with `k` existing entries one of the first `k + 1`
/// variants must be free. Calling this on its own output returns the
/// same path as long as nothing was created in between.
pub fn resolve_collision_free_name(candidate: &Path) -> PathBuf {
    if !occupied(candidate) {
        return candidate.to_path_buf();
    }

    let parent = match candidate.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let bound = fs::read_dir(parent)
        .map(|entries| entries.count())
        .unwrap_or(MAX_PROBES);

    for n in 1..=bound + 1 {
        let probe = disambiguate(candidate, n);
        if !occupied(&probe) {
            return probe;
        }
    }

    // Entries appeared while probing; fall back to a timestamp suffix.
    let timestamp = chrono::Utc::now().timestamp_millis();
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let new_name = match candidate.extension() {
        Some(ext) => format!("{}_{}.{}", stem, timestamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, timestamp),
    };
    candidate.with_file_name(new_name)
}

/// Validate a filename for cross-platform compatibility.
pub fn validate_filename(name: &str) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> { Err(EngineError::invalid_name(name, reason)) };

    if name.is_empty() {
        return invalid("Name cannot be empty");
    }

    if name.len() > 255 {
        return invalid("Name is too long (max 255 characters)");
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(EngineError::invalid_name(
                name,
                format!("Name cannot contain '{}'", c.escape_default()),
            ));
        }
    }

    #[cfg(target_os = "windows")]
    {
        for c in ['\\', ':', '*', '?', '"', '<', '>', '|'] {
            if name.contains(c) {
                return Err(EngineError::invalid_name(
                    name,
                    format!("Name cannot contain '{}'", c),
                ));
            }
        }
    }

    if name == "." || name == ".." {
        return invalid("'.' and '..' are reserved names");
    }

    if name.starts_with(' ') || name.ends_with(' ') {
        return invalid("Name cannot start or end with spaces");
    }

    if name.ends_with('.') {
        return invalid("Name cannot end with a dot");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disambiguate() {
        assert_eq!(
            disambiguate(Path::new("/tmp/test.txt"), 1),
            PathBuf::from("/tmp/test (1).txt")
        );
        assert_eq!(
            disambiguate(Path::new("/tmp/testfile"), 2),
            PathBuf::from("/tmp/testfile (2)")
        );
        assert_eq!(
            disambiguate(Path::new("/tmp/.bashrc"), 1),
            PathBuf::from("/tmp/.bashrc (1)")
        );
    }

    #[test]
    fn test_free_name_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let candidate = dir.path().join("new.txt");
        assert_eq!(resolve_collision_free_name(&candidate), candidate);
    }

    #[test]
    fn test_collision_appends_counter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::write(dir.path().join("a (1).txt"), "x").unwrap();

        let resolved = resolve_collision_free_name(&dir.path().join("a.txt"));
        assert_eq!(resolved, dir.path().join("a (2).txt"));
    }

    #[test]
    fn test_collision_free_name_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("photos")).unwrap();

        let first = resolve_collision_free_name(&dir.path().join("photos"));
        let second = resolve_collision_free_name(&first);
        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("photos (1)"));
    }

    #[test]
    fn test_validate_filename_valid() {
        assert!(validate_filename("test.txt").is_ok());
        assert!(validate_filename("my-file").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("file with spaces").is_ok());
    }

    #[test]
    fn test_validate_filename_invalid() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("test/file").is_err());
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("file ").is_err());
        assert!(validate_filename(" file").is_err());
        assert!(validate_filename("file.").is_err());
    }
}
