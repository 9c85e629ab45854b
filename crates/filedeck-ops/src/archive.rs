//! Archive extraction and zip compression.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use filedeck_core::{EngineError, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Supported archive formats, detected from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarXz,
    TarBz2,
    Gz,
    Xz,
    Bz2,
}

/// Longest suffixes first so `.tar.gz` wins over `.gz`.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tar.xz", ArchiveFormat::TarXz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tgz", ArchiveFormat::TarGz),
    (".txz", ArchiveFormat::TarXz),
    (".tbz", ArchiveFormat::TarBz2),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
    (".bz2", ArchiveFormat::Bz2),
    (".gz", ArchiveFormat::Gz),
    (".xz", ArchiveFormat::Xz),
];

impl ArchiveFormat {
    /// Detect the format and the length of the matched suffix.
    fn detect(path: &Path) -> Option<(Self, usize)> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
            .map(|(suffix, format)| (*format, suffix.len()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::detect(path).map(|(format, _)| format)
    }
}

/// Name `archive` without its archive suffix: `a.tar.gz` → `a`.
///
/// Unrecognised names lose only their last extension.
pub fn strip_archive_suffix(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match ArchiveFormat::detect(archive) {
        Some((_, len)) => name[..name.len() - len].to_string(),
        None => archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(name),
    }
}

/// Directory `archive` extracts into by default (before collision checks).
pub fn extraction_dir(archive: &Path) -> PathBuf {
    archive.with_file_name(strip_archive_suffix(archive))
}

/// Number of entries in a zip archive.
pub fn zip_entry_count(path: &Path) -> Result<usize> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| EngineError::archive(path, e))?;
    Ok(archive.len())
}

/// Extract `source` into `dest`, dispatching on the file extension.
///
/// The first failing entry aborts the extraction; entries already written
/// stay in place. `on_entry` runs once per extracted entry.
pub fn extract(source: &Path, dest: &Path, on_entry: &mut dyn FnMut(&Path)) -> Result<()> {
    let format = ArchiveFormat::from_path(source).ok_or_else(|| EngineError::UnsupportedArchive {
        path: source.to_path_buf(),
    })?;
    fs::create_dir_all(dest).map_err(|e| EngineError::io(dest, e))?;

    let open = || {
        File::open(source)
            .map(BufReader::new)
            .map_err(|e| EngineError::io(source, e))
    };
    match format {
        ArchiveFormat::Zip => extract_zip(source, dest, on_entry),
        ArchiveFormat::Tar => unpack_tar(open()?, source, dest, on_entry),
        ArchiveFormat::TarGz => unpack_tar(flate2::read::GzDecoder::new(open()?), source, dest, on_entry),
        ArchiveFormat::TarXz => unpack_tar(xz2::read::XzDecoder::new(open()?), source, dest, on_entry),
        ArchiveFormat::TarBz2 => unpack_tar(bzip2::read::BzDecoder::new(open()?), source, dest, on_entry),
        ArchiveFormat::Gz => decompress(flate2::read::GzDecoder::new(open()?), source, dest, on_entry),
        ArchiveFormat::Xz => decompress(xz2::read::XzDecoder::new(open()?), source, dest, on_entry),
        ArchiveFormat::Bz2 => decompress(bzip2::read::BzDecoder::new(open()?), source, dest, on_entry),
    }
}

fn extract_zip(source: &Path, dest: &Path, on_entry: &mut dyn FnMut(&Path)) -> Result<()> {
    let file = File::open(source).map_err(|e| EngineError::io(source, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| EngineError::archive(source, e))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| EngineError::archive(source, e))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(EngineError::archive(
                source,
                format!("entry '{}' escapes the destination", entry.name()),
            ));
        };
        let out = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| EngineError::io(&out, e))?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
            }
            let mut writer = File::create(&out).map_err(|e| EngineError::io(&out, e))?;
            io::copy(&mut entry, &mut writer).map_err(|e| EngineError::archive(source, e))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(&out, fs::Permissions::from_mode(mode)) {
                    tracing::warn!(target: "filedeck::ops", path = %out.display(), error = %e, "failed to restore permissions");
                }
            }
        }
        on_entry(&out);
    }

    Ok(())
}

fn unpack_tar<R: Read>(
    reader: R,
    source: &Path,
    dest: &Path,
    on_entry: &mut dyn FnMut(&Path),
) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|e| EngineError::archive(source, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| EngineError::archive(source, e))?;
        let relative = entry
            .path()
            .map_err(|e| EngineError::archive(source, e))?
            .into_owned();
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| EngineError::archive(source, e))?;
        if !unpacked {
            return Err(EngineError::archive(
                source,
                format!("entry '{}' escapes the destination", relative.display()),
            ));
        }
        on_entry(&dest.join(relative));
    }

    Ok(())
}

fn decompress<R: Read>(
    mut reader: R,
    source: &Path,
    dest: &Path,
    on_entry: &mut dyn FnMut(&Path),
) -> Result<()> {
    let out = dest.join(strip_archive_suffix(source));
    let mut writer = File::create(&out).map_err(|e| EngineError::io(&out, e))?;
    io::copy(&mut reader, &mut writer).map_err(|e| EngineError::archive(source, e))?;
    on_entry(&out);
    Ok(())
}

/// Write `source` (recursively, if a directory) into a new zip at `dest`.
///
/// `dest` must not exist. On failure the partial archive is removed.
pub fn compress(source: &Path, dest: &Path, on_file: &mut dyn FnMut(&Path)) -> Result<()> {
    fs::symlink_metadata(source).map_err(|e| EngineError::io(source, e))?;
    let base = PathBuf::from(source.file_name().ok_or_else(|| {
        EngineError::archive(source, "source has no file name")
    })?);

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| EngineError::io(dest, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    let result = add_to_zip(&mut writer, source, &base, dest, on_file).and_then(|()| {
        writer
            .finish()
            .map(|_| ())
            .map_err(|e| EngineError::archive(dest, e))
    });

    if result.is_err() {
        if let Err(e) = fs::remove_file(dest) {
            tracing::warn!(target: "filedeck::ops", path = %dest.display(), error = %e, "failed to remove partial archive");
        }
    }
    result
}

fn add_to_zip<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    path: &Path,
    name: &Path,
    archive: &Path,
    on_file: &mut dyn FnMut(&Path),
) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| EngineError::io(path, e))?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };
    let entry_name = zip_entry_name(name);

    if metadata.is_dir() {
        writer
            .add_directory(format!("{entry_name}/"), options)
            .map_err(|e| EngineError::archive(archive, e))?;

        let mut children = fs::read_dir(path)
            .map_err(|e| EngineError::io(path, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| EngineError::io(path, e))?;
        children.sort_by_key(|e| e.file_name());

        for child in children {
            add_to_zip(writer, &child.path(), &name.join(child.file_name()), archive, on_file)?;
        }
        return Ok(());
    }

    writer
        .start_file(entry_name, options)
        .map_err(|e| EngineError::archive(archive, e))?;
    let mut file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    io::copy(&mut file, writer).map_err(|e| EngineError::io(path, e))?;
    on_file(path);
    Ok(())
}

/// Zip entry names always use forward slashes.
fn zip_entry_name(name: &Path) -> String {
    name.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_detection() {
        assert_eq!(ArchiveFormat::from_path(Path::new("a.zip")), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_path(Path::new("a.TAR.GZ")), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path(Path::new("a.tgz")), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path(Path::new("a.log.gz")), Some(ArchiveFormat::Gz));
        assert_eq!(ArchiveFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(ArchiveFormat::from_path(Path::new(".zip")), None);
    }

    #[test]
    fn test_strip_archive_suffix() {
        assert_eq!(strip_archive_suffix(Path::new("/x/photos.tar.gz")), "photos");
        assert_eq!(strip_archive_suffix(Path::new("/x/photos.zip")), "photos");
        assert_eq!(strip_archive_suffix(Path::new("/x/notes.txt")), "notes");
        assert_eq!(extraction_dir(Path::new("/x/a.tar.xz")), PathBuf::from("/x/a"));
    }

    #[test]
    fn test_compress_then_extract_zip() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("docs");
        fs::create_dir_all(src.join("inner")).unwrap();
        fs::write(src.join("a.txt"), "alpha").unwrap();
        fs::write(src.join("inner/b.txt"), "beta").unwrap();

        let zip_path = dir.path().join("docs.zip");
        let mut files = 0;
        compress(&src, &zip_path, &mut |_| files += 1).unwrap();
        assert_eq!(files, 2);
        assert_eq!(zip_entry_count(&zip_path).unwrap(), 4);

        let out = dir.path().join("out");
        let mut entries = 0;
        extract(&zip_path, &out, &mut |_| entries += 1).unwrap();
        assert_eq!(entries, 4);
        assert_eq!(fs::read_to_string(out.join("docs/inner/b.txt")).unwrap(), "beta");
    }

    #[test]
    fn test_compress_refuses_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "a").unwrap();
        let zip_path = dir.path().join("a.zip");
        fs::write(&zip_path, "occupied").unwrap();

        assert!(compress(&src, &zip_path, &mut |_| {}).is_err());
        assert_eq!(fs::read_to_string(&zip_path).unwrap(), "occupied");
    }

    #[test]
    fn test_zip_entry_escaping_destination_is_rejected() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("evil.zip");
        {
            let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
            writer
                .start_file("ok.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"fine").unwrap();
            writer
                .start_file("../escape.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"bad").unwrap();
            writer.finish().unwrap();
        }

        let out = dir.path().join("out");
        let err = extract(&zip_path, &out, &mut |_| {}).unwrap_err();
        assert!(matches!(err, EngineError::Archive { .. }));
        assert!(out.join("ok.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = TempDir::new().unwrap();
        let payload = dir.path().join("payload.txt");
        fs::write(&payload, "tarred").unwrap();

        let archive_path = dir.path().join("bundle.tar.gz");
        {
            let encoder = flate2::write::GzEncoder::new(
                File::create(&archive_path).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(encoder);
            builder.append_path_with_name(&payload, "bundle/payload.txt").unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("bundle");
        extract(&archive_path, &out, &mut |_| {}).unwrap();
        assert_eq!(fs::read_to_string(out.join("bundle/payload.txt")).unwrap(), "tarred");
    }

    #[test]
    fn test_extract_single_gz() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("server.log.gz");
        {
            let mut encoder = flate2::write::GzEncoder::new(
                File::create(&archive_path).unwrap(),
                flate2::Compression::default(),
            );
            encoder.write_all(b"line one\n").unwrap();
            encoder.finish().unwrap();
        }

        let out = dir.path().join("server.log");
        extract(&archive_path, &out, &mut |_| {}).unwrap();
        assert_eq!(fs::read_to_string(out.join("server.log")).unwrap(), "line one\n");
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            extract(&file, &dir.path().join("out"), &mut |_| {}),
            Err(EngineError::UnsupportedArchive { .. })
        ));
    }
}
