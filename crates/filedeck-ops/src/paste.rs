//! Paste of a staged copy or cut set.

use std::fs;
use std::path::{Path, PathBuf};

use filedeck_core::{EngineError, Process, Result};

use crate::copy::{copy_recursive, copy_then_remove, remove_path, rename_path};
use crate::naming::{occupied, resolve_collision_free_name};
use crate::paths::count_batch;
use crate::tracker::{run_blocking, ProcessTracker, Ticker};

/// Paste `items` into `dest_dir`.
///
/// `total` is the recursive file count of the batch; items that cannot be
/// counted contribute nothing. Each item lands under a collision-free name.
pub(crate) async fn paste_batch(
    tracker: ProcessTracker,
    items: Vec<PathBuf>,
    cut: bool,
    dest_dir: PathBuf,
) -> Process {
    let counted = {
        let items = items.clone();
        run_blocking(move || Ok(count_batch(&items))).await
    };
    let counts = match counted {
        Ok((counts, total)) => {
            tracker.set_total(total);
            counts
        }
        Err(e) => return tracker.fail(&dest_dir, &e).await,
    };
    tracker.announce().await;
    let ticker = tracker.ticker();

    for (item, count) in items.into_iter().zip(counts) {
        if let Err(e) = ticker.check_cancelled() {
            return tracker.fail(&item, &e).await;
        }

        let result = {
            let (item, dest_dir, ticker) = (item.clone(), dest_dir.clone(), ticker.clone());
            run_blocking(move || paste_one(&item, &dest_dir, cut, count, &ticker)).await
        };
        if let Err(e) = result {
            return tracker.fail(&item, &e).await;
        }
    }

    tracker.succeed().await
}

fn paste_one(item: &Path, dest_dir: &Path, cut: bool, count: usize, ticker: &Ticker) -> Result<()> {
    fs::symlink_metadata(item).map_err(|e| EngineError::io(item, e))?;
    let name = item.file_name().ok_or_else(|| EngineError::NotFound {
        path: item.to_path_buf(),
    })?;

    if dest_dir.starts_with(item) {
        return Err(EngineError::SourceIsAncestor {
            path: item.to_path_buf(),
        });
    }

    // Cutting into the directory the item already lives in changes nothing.
    if cut && item.parent() == Some(dest_dir) {
        ticker.advance(item, count);
        return Ok(());
    }

    let dest = resolve_collision_free_name(&dest_dir.join(name));

    if !cut {
        let copied = copy_recursive(item, &dest, &mut |file| ticker.advance(file, 1));
        if copied.is_err() && occupied(&dest) {
            if let Err(e) = remove_path(&dest) {
                tracing::warn!(target: "filedeck::ops", path = %dest.display(), error = %e, "failed to clean up partial copy");
            }
        }
        return copied;
    }

    match rename_path(item, &dest) {
        Ok(()) => {
            ticker.advance(item, count);
            Ok(())
        }
        Err(e) if e.is_cross_device() => {
            tracing::debug!(target: "filedeck::ops", path = %item.display(), "cross-device cut, copying");
            copy_then_remove(item, &dest, &mut |file| ticker.advance(file, 1))
        }
        Err(e) => Err(e),
    }
}
