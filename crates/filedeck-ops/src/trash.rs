//! Trash adapter.
//!
//! On macOS and Windows the platform recycle facility is used through the
//! `trash` crate. Elsewhere items are relocated following the freedesktop
//! trash layout: the item moves to `<root>/files/<name>` and a
//! `<root>/info/<name>.trashinfo` record stores the original path and the
//! deletion time.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use filedeck_core::{EngineConfig, EngineError, Result};

use crate::copy::{copy_recursive, remove_path, rename_path};
use crate::naming::{disambiguate, occupied, resolve_collision_free_name};

/// Where a trashed item ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashedItem {
    /// Absolute path the item had before trashing.
    pub original: PathBuf,
    /// Location under `files/`.
    pub trashed: PathBuf,
    /// The `.trashinfo` sidecar.
    pub info: PathBuf,
}

/// A trash location.
#[derive(Debug, Clone)]
pub struct TrashCan {
    root: PathBuf,
    native: bool,
}

impl TrashCan {
    pub fn new(root: impl Into<PathBuf>, native: bool) -> Self {
        Self {
            root: root.into(),
            native,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.trash_root.clone(), config.use_native_trash)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    pub fn info_dir(&self) -> PathBuf {
        self.root.join("info")
    }

    /// Create the trash root with its `files/` and `info/` subdirectories.
    pub fn ensure_dirs(&self) -> Result<()> {
        if self.native {
            return Ok(());
        }
        for dir in [self.files_dir(), self.info_dir()] {
            fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Move `path` to the trash.
    ///
    /// Either the move completes or `path` is left where it was.
    pub fn move_to_trash(&self, path: &Path) -> Result<()> {
        if self.native {
            return trash::delete(path).map_err(|e| EngineError::Trash {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
        self.put(path).map(|_| ())
    }

    /// Relocate `path` into the freedesktop trash.
    pub fn put(&self, path: &Path) -> Result<TrashedItem> {
        let original = std::path::absolute(path).map_err(|e| EngineError::io(path, e))?;
        fs::symlink_metadata(&original).map_err(|e| EngineError::io(&original, e))?;

        if original.starts_with(&self.root) {
            return Err(EngineError::Trash {
                path: original,
                message: "item is already inside the trash".to_string(),
            });
        }
        let name = original
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| EngineError::Trash {
                path: original.clone(),
                message: "path has no file name".to_string(),
            })?;

        self.ensure_dirs()?;
        let (trashed, info, mut info_file) = self.reserve(&name)?;

        let record = trash_info(&original, Local::now());
        if let Err(e) = info_file.write_all(record.as_bytes()) {
            discard(&info);
            return Err(EngineError::io(&info, e));
        }
        drop(info_file);

        let moved = match rename_path(&original, &trashed) {
            Err(e) if e.is_cross_device() => {
                tracing::debug!(target: "filedeck::ops", path = %original.display(), "trash is on another device, copying");
                relocate_across_devices(&original, &trashed)
            }
            other => other,
        };

        if let Err(e) = moved {
            // Keep the record if a copy made it into files/.
            if !occupied(&trashed) {
                discard(&info);
            }
            return Err(e);
        }

        Ok(TrashedItem {
            original,
            trashed,
            info,
        })
    }

    /// Claim a name free in both `files/` and `info/`.
    ///
    /// The `.trashinfo` file is created exclusively, so two writers never
    /// claim the same name.
    fn reserve(&self, name: &std::ffi::OsStr) -> Result<(PathBuf, PathBuf, File)> {
        let files = self.files_dir();
        let info_dir = self.info_dir();
        let base = files.join(name);

        let bound = fs::read_dir(&info_dir).map(|e| e.count()).unwrap_or(0)
            + fs::read_dir(&files).map(|e| e.count()).unwrap_or(0);

        for n in 0..=bound {
            let trashed = if n == 0 {
                base.clone()
            } else {
                disambiguate(&base, n)
            };
            if occupied(&trashed) {
                continue;
            }

            let mut info_name: OsString = trashed.file_name().unwrap_or(name).to_os_string();
            info_name.push(".trashinfo");
            let info = info_dir.join(info_name);

            match OpenOptions::new().write(true).create_new(true).open(&info) {
                Ok(file) => return Ok((trashed, info, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(EngineError::io(&info, e)),
            }
        }

        Err(EngineError::Trash {
            path: base,
            message: "no free name in trash".to_string(),
        })
    }
}

/// Move `source` to `dest` on another device.
///
/// `source` is first renamed to a hidden sibling so it leaves its original
/// path atomically. The sibling is copied to `dest`; if that fails the
/// partial copy is dropped and the sibling is renamed back. Once the copy
/// is complete a failure to remove the sibling is only logged.
fn relocate_across_devices(source: &Path, dest: &Path) -> Result<()> {
    if occupied(dest) {
        return Err(EngineError::AlreadyExists {
            path: dest.to_path_buf(),
        });
    }

    let mut hidden = OsString::from(".");
    hidden.push(source.file_name().unwrap_or_default());
    hidden.push(".trashing");
    let staging = resolve_collision_free_name(&source.with_file_name(hidden));
    rename_path(source, &staging)?;

    if let Err(e) = copy_recursive(&staging, dest, &mut |_| {}) {
        if occupied(dest) {
            if let Err(cleanup) = remove_path(dest) {
                tracing::warn!(target: "filedeck::ops", path = %dest.display(), error = %cleanup, "failed to clean up partial trash copy");
            }
        }
        if let Err(restore) = rename_path(&staging, source) {
            tracing::error!(target: "filedeck::ops", path = %staging.display(), error = %restore, "failed to restore item after trash copy failed");
        }
        return Err(e);
    }

    if let Err(e) = remove_path(&staging) {
        tracing::warn!(target: "filedeck::ops", path = %staging.display(), error = %e, "trashed item copied but staging copy remains");
    }
    Ok(())
}

/// Recursively and permanently remove `path`.
pub fn permanently_delete(path: &Path) -> Result<()> {
    remove_path(path)
}

fn discard(info: &Path) {
    if let Err(e) = fs::remove_file(info) {
        tracing::warn!(target: "filedeck::ops", path = %info.display(), error = %e, "failed to remove trash info");
    }
}

fn trash_info(original: &Path, deleted_at: DateTime<Local>) -> String {
    format!(
        "[Trash Info]\nPath={}\nDeletionDate={}\n",
        encode_path(original),
        deleted_at.format("%Y-%m-%dT%H:%M:%S")
    )
}

/// Percent-encode a path for the `Path=` key, keeping separators.
#[cfg(unix)]
fn encode_path(path: &Path) -> String {
    use std::os::unix::ffi::OsStrExt;

    path.as_os_str()
        .as_bytes()
        .split(|b| *b == b'/')
        .map(urlencoding::encode_binary)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(not(unix))]
fn encode_path(path: &Path) -> String {
    path.to_string_lossy()
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}
