//! Rename of a single entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filedeck_core::{EngineError, OperationKind, Process};

use crate::copy::rename_path;
use crate::engine::OpsContext;
use crate::naming::occupied;
use crate::tracker::{run_blocking, ProcessTracker};

/// Rename `source` to `new_name` within its directory.
///
/// The name must already be validated. Renaming onto another existing
/// entry fails; renaming to the current name succeeds without touching
/// the filesystem. Returns the finished process and the entry's path
/// afterwards.
pub(crate) async fn rename_entry(ctx: &Arc<OpsContext>, source: &Path, new_name: &str) -> (Process, PathBuf) {
    let target = source.with_file_name(new_name);
    let tracker = ProcessTracker::start(ctx, OperationKind::Rename, source, 1).await;

    if target == source {
        return (tracker.succeed().await, target);
    }
    if occupied(&target) {
        let err = EngineError::AlreadyExists { path: target };
        return (tracker.fail(source, &err).await, source.to_path_buf());
    }

    let result = {
        let (source, target) = (source.to_path_buf(), target.clone());
        run_blocking(move || rename_path(&source, &target)).await
    };

    match result {
        Ok(()) => {
            tracker.ticker().advance(&target, 1);
            (tracker.succeed().await, target)
        }
        Err(e) => (tracker.fail(source, &e).await, source.to_path_buf()),
    }
}
