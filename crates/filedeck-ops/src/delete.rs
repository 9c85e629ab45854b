//! Trash and permanent-delete batches.

use std::path::PathBuf;
use std::sync::Arc;

use filedeck_core::Process;

use crate::engine::OpsContext;
use crate::tracker::{run_blocking, ProcessTracker};
use crate::trash::permanently_delete;

/// Remove `items` in order, stopping at the first failure.
///
/// `done` counts removed items; items after a failure are left untouched.
pub(crate) async fn remove_batch(
    ctx: Arc<OpsContext>,
    tracker: ProcessTracker,
    items: Vec<PathBuf>,
    permanent: bool,
) -> Process {
    tracker.announce().await;
    let ticker = tracker.ticker();

    for item in items {
        if let Err(e) = ticker.check_cancelled() {
            return tracker.fail(&item, &e).await;
        }

        let trash = Arc::clone(&ctx.trash);
        let path = item.clone();
        let result = run_blocking(move || {
            if permanent {
                permanently_delete(&path)
            } else {
                trash.move_to_trash(&path)
            }
        })
        .await;

        match result {
            Ok(()) => ticker.advance(&item, 1),
            Err(e) => return tracker.fail(&item, &e).await,
        }
    }

    tracker.succeed().await
}
