//! Extract and compress processes.

use std::fs;
use std::path::PathBuf;

use filedeck_core::{EngineError, Process};

use crate::archive::{compress, extract, extraction_dir, zip_entry_count, ArchiveFormat};
use crate::naming::resolve_collision_free_name;
use crate::paths::count_files;
use crate::tracker::{run_blocking, ProcessTracker};

/// Extract `archive` next to itself into a fresh, collision-free directory.
///
/// Zip archives advance once per entry; other formats finish in one step.
pub(crate) async fn extract_archive(tracker: ProcessTracker, archive: PathBuf, format: ArchiveFormat) -> Process {
    if format == ArchiveFormat::Zip {
        let counted = {
            let archive = archive.clone();
            run_blocking(move || zip_entry_count(&archive)).await
        };
        match counted {
            Ok(entries) => tracker.set_total(entries),
            Err(e) => return tracker.fail(&archive, &e).await,
        }
    }
    tracker.announce().await;

    let ticker = tracker.ticker();
    let result = {
        let archive = archive.clone();
        run_blocking(move || {
            let dest = resolve_collision_free_name(&extraction_dir(&archive));
            fs::create_dir(&dest).map_err(|e| EngineError::io(&dest, e))?;
            tracing::debug!(target: "filedeck::ops", archive = %archive.display(), dest = %dest.display(), "extracting");

            if format == ArchiveFormat::Zip {
                extract(&archive, &dest, &mut |entry| ticker.advance(entry, 1))
            } else {
                extract(&archive, &dest, &mut |_| {})?;
                ticker.advance(&archive, 1);
                Ok(())
            }
        })
        .await
    };

    match result {
        Ok(()) => tracker.succeed().await,
        Err(e) => tracker.fail(&archive, &e).await,
    }
}

/// Zip `source` into `<stem>.zip` beside it, under a collision-free name.
pub(crate) async fn compress_path(tracker: ProcessTracker, source: PathBuf) -> Process {
    let counted = {
        let source = source.clone();
        run_blocking(move || count_files(&source)).await
    };
    match counted {
        Ok(files) => tracker.set_total(files),
        Err(e) => return tracker.fail(&source, &e).await,
    }
    tracker.announce().await;

    let ticker = tracker.ticker();
    let result = {
        let source = source.clone();
        run_blocking(move || {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dest = resolve_collision_free_name(&source.with_file_name(format!("{stem}.zip")));
            tracing::debug!(target: "filedeck::ops", source = %source.display(), dest = %dest.display(), "compressing");
            compress(&source, &dest, &mut |file| ticker.advance(file, 1))
        })
        .await
    };

    match result {
        Ok(()) => tracker.succeed().await,
        Err(e) => tracker.fail(&source, &e).await,
    }
}
