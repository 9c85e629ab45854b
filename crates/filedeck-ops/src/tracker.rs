//! Per-process progress tracking.

use std::path::Path;
use std::sync::Arc;

use filedeck_core::{EngineError, Message, OperationKind, Process, ProcessId, Result};
use tokio_util::sync::CancellationToken;

use crate::engine::OpsContext;

/// Run blocking filesystem work off the async worker threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::TaskFailed {
            message: e.to_string(),
        })?
}

/// Handle for advancing a running process, usable from blocking threads.
#[derive(Clone)]
pub(crate) struct Ticker {
    id: ProcessId,
    ctx: Arc<OpsContext>,
    cancel: CancellationToken,
}

impl Ticker {
    /// Mark `n` more units done with `item` as the current label, then
    /// offer the snapshot to the bus.
    pub fn advance(&self, item: &Path, n: usize) {
        let snapshot = self.ctx.registry.update(self.id, |p| {
            if !p.is_finished() {
                p.set_current(item);
                p.advance(n);
            }
        });
        if let Some(snapshot) = snapshot {
            self.ctx.bus.tick(Message::process(snapshot));
        }
    }

    /// Error out if the process was cancelled. Checked between items only.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }
}

/// Owner of one process's lifecycle.
///
/// The terminal methods consume the tracker, so a process is finished and
/// announced at most once.
pub(crate) struct ProcessTracker {
    ticker: Ticker,
    initial: Process,
}

impl ProcessTracker {
    /// Allocate and record a new in-progress process without announcing it.
    pub fn register(ctx: &Arc<OpsContext>, kind: OperationKind, first_item: &Path, total: usize) -> Self {
        let id = ctx.registry.next_id();
        let process = Process::new(id, kind, first_item, total);
        ctx.registry.insert(process.clone());

        let cancel = CancellationToken::new();
        ctx.cancel_tokens.insert(id, cancel.clone());

        tracing::debug!(target: "filedeck::ops", %id, %kind, total, item = %first_item.display(), "process registered");

        Self {
            ticker: Ticker {
                id,
                ctx: Arc::clone(ctx),
                cancel,
            },
            initial: process,
        }
    }

    /// Register and announce in one step.
    pub async fn start(ctx: &Arc<OpsContext>, kind: OperationKind, first_item: &Path, total: usize) -> Self {
        let tracker = Self::register(ctx, kind, first_item, total);
        tracker.announce().await;
        tracker
    }

    pub fn id(&self) -> ProcessId {
        self.ticker.id
    }

    pub fn ticker(&self) -> Ticker {
        self.ticker.clone()
    }

    /// Set `total` once it is known. Call before the first announcement.
    pub fn set_total(&self, total: usize) {
        self.ticker.ctx.registry.update(self.id(), |p| p.total = total);
    }

    /// Announce the current snapshot; never dropped.
    pub async fn announce(&self) {
        if let Some(snapshot) = self.ticker.ctx.registry.record(self.id()) {
            self.ticker.ctx.bus.announce(Message::process(snapshot)).await;
        }
    }

    pub async fn succeed(self) -> Process {
        let process = self.finish(|p| p.succeed()).await;
        tracing::info!(target: "filedeck::ops", id = %process.id, kind = %process.kind, done = process.done, "process finished");
        process
    }

    /// Finish as failed, labelled with the offending item.
    pub async fn fail(self, item: &Path, error: &EngineError) -> Process {
        tracing::error!(target: "filedeck::ops", id = %self.id(), path = %item.display(), %error, "process failed");
        self.finish(|p| {
            p.set_current(item);
            p.fail()
        })
        .await
    }

    async fn finish(self, outcome: impl FnOnce(&mut Process) -> Result<()>) -> Process {
        let ctx = &self.ticker.ctx;
        let id = self.ticker.id;
        ctx.cancel_tokens.remove(&id);

        let mut process = ctx.registry.record(id).unwrap_or(self.initial);
        if let Err(e) = outcome(&mut process) {
            tracing::warn!(target: "filedeck::ops", %id, error = %e, "ignoring second terminal transition");
        }
        ctx.registry.insert(process.clone());
        ctx.bus.announce(Message::process(process.clone())).await;
        process
    }
}
