//! The engine facade driven by the interactive thread.
//!
//! Methods that start a batch spawn a tokio task and must be called from
//! within a runtime. Panel and clipboard mutations happen synchronously
//! before the method returns; background tasks only touch their own
//! process record and the message bus.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use filedeck_core::{
    ConfirmationRequest, EngineConfig, EngineError, Message, OperationKind, Panel, PanelElement,
    PendingAction, Process, ProcessId, Result,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::archive::ArchiveFormat;
use crate::archive_op::{compress_path, extract_archive};
use crate::bus::{self, MessageBus, MessageReceiver, Registry};
use crate::clipboard::{ArboardClipboard, ClipboardStage, SystemClipboard};
use crate::create::{create_entry, CreateRequest};
use crate::delete::remove_batch;
use crate::naming::occupied;
use crate::paste::paste_batch;
use crate::paths::is_external_volume;
use crate::rename::rename_entry;
use crate::tracker::ProcessTracker;
use crate::trash::TrashCan;

/// State shared between the engine and its background tasks.
pub(crate) struct OpsContext {
    pub registry: Registry,
    pub bus: MessageBus,
    pub trash: Arc<TrashCan>,
    pub cancel_tokens: DashMap<ProcessId, CancellationToken>,
}

/// A running batch process.
#[derive(Debug)]
pub struct BatchHandle {
    id: ProcessId,
    task: JoinHandle<Process>,
}

impl BatchHandle {
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Wait for the batch and return its terminal snapshot.
    pub async fn wait(self) -> Result<Process> {
        self.task.await.map_err(|e| EngineError::TaskFailed {
            message: e.to_string(),
        })
    }
}

/// File operation engine.
pub struct Engine {
    ctx: Arc<OpsContext>,
    config: EngineConfig,
    clipboard: ClipboardStage,
    system_clipboard: Box<dyn SystemClipboard>,
}

impl Engine {
    /// Create an engine and the receiver the renderer drains.
    ///
    /// Prepares the trash directories when the built-in trash is used.
    pub fn new(config: EngineConfig) -> Result<(Self, MessageReceiver)> {
        let trash = TrashCan::from_config(&config);
        trash.ensure_dirs()?;

        let (bus, receiver) = bus::channel(config.bus_capacity, config.tick_threshold);
        let ctx = Arc::new(OpsContext {
            registry: Registry::new(),
            bus,
            trash: Arc::new(trash),
            cancel_tokens: DashMap::new(),
        });

        tracing::debug!(target: "filedeck::ops", trash_root = %config.trash_root.display(), native = config.use_native_trash, "engine ready");

        let engine = Self {
            ctx,
            config,
            clipboard: ClipboardStage::new(),
            system_clipboard: Box::new(ArboardClipboard::default()),
        };
        Ok((engine, receiver))
    }

    /// Replace the system clipboard used for mirroring.
    pub fn with_system_clipboard(mut self, clipboard: impl SystemClipboard + 'static) -> Self {
        self.system_clipboard = Box::new(clipboard);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.ctx.registry
    }

    pub fn clipboard(&self) -> &ClipboardStage {
        &self.clipboard
    }

    pub fn trash(&self) -> &TrashCan {
        &self.ctx.trash
    }

    /// Ask for confirmation before deleting the panel's targets.
    ///
    /// Targets on an external volume get a permanent-delete warning; all
    /// others get a move-to-trash warning. The request is posted to the
    /// bus and also returned. Nothing is deleted until [`Engine::confirm`].
    pub fn request_delete(&self, panel: &Panel) -> Option<ConfirmationRequest> {
        let targets = panel.targets();
        if targets.is_empty() {
            return None;
        }

        let external = is_external_volume(
            &panel.location,
            &self.config.trash_root,
            &self.config.external_mount_prefixes,
        );
        let request = if external {
            ConfirmationRequest::permanent(targets)
        } else {
            ConfirmationRequest::trash(targets)
        };

        let id = self.ctx.registry.next_id();
        self.ctx.bus.post(Message::confirmation(id, request.clone()));
        Some(request)
    }

    /// Continue a confirmed action.
    pub fn confirm(&self, action: PendingAction, panel: &mut Panel) -> Option<BatchHandle> {
        match action {
            PendingAction::TrashItems { paths } => self.start_removal(paths, false, panel),
            PendingAction::DeleteItems { paths } => self.start_removal(paths, true, panel),
        }
    }

    /// Move the panel's targets to the trash.
    pub fn trash_items(&self, panel: &mut Panel) -> Option<BatchHandle> {
        self.start_removal(panel.targets(), false, panel)
    }

    /// Permanently delete the panel's targets.
    pub fn delete_items(&self, panel: &mut Panel) -> Option<BatchHandle> {
        self.start_removal(panel.targets(), true, panel)
    }

    fn start_removal(&self, paths: Vec<PathBuf>, permanent: bool, panel: &mut Panel) -> Option<BatchHandle> {
        let first = first_existing(&paths)?;
        let kind = if permanent {
            OperationKind::Delete
        } else {
            OperationKind::Trash
        };

        let removed = paths.len();
        let tracker = ProcessTracker::register(&self.ctx, kind, &first, removed);
        let handle = self.spawn(tracker, move |ctx, tracker| remove_batch(ctx, tracker, paths, permanent));

        panel.settle_after_removal(removed);
        Some(handle)
    }

    /// Stage the panel's targets for copying. Returns how many were staged.
    pub fn copy_items(&mut self, panel: &Panel) -> usize {
        self.stage(panel, false)
    }

    /// Stage the panel's targets for moving. Returns how many were staged.
    pub fn cut_items(&mut self, panel: &Panel) -> usize {
        self.stage(panel, true)
    }

    fn stage(&mut self, panel: &Panel, cut: bool) -> usize {
        let targets: Vec<PathBuf> = panel.targets().into_iter().filter(|p| occupied(p)).collect();
        if targets.is_empty() {
            return 0;
        }
        self.clipboard.stage(
            targets,
            cut,
            self.system_clipboard.as_mut(),
            self.config.clipboard_mirror_limit,
        );
        self.clipboard.items().len()
    }

    /// Paste the staged set into the panel's directory, emptying the stage.
    pub fn paste_items(&mut self, panel: &Panel) -> Option<BatchHandle> {
        let (items, cut) = self.clipboard.take_all();
        let Some(first) = first_existing(&items) else {
            if !items.is_empty() {
                tracing::debug!(target: "filedeck::ops", count = items.len(), "staged items are gone, nothing to paste");
            }
            return None;
        };
        let kind = if cut { OperationKind::Cut } else { OperationKind::Copy };

        let tracker = ProcessTracker::register(&self.ctx, kind, &first, 0);
        let dest = panel.location.clone();
        Some(self.spawn(tracker, move |_, tracker| paste_batch(tracker, items, cut, dest)))
    }

    /// Extract the archive under the cursor. Non-archives are ignored.
    pub fn extract_under_cursor(&self, panel: &Panel) -> Option<BatchHandle> {
        let archive = panel.current()?.location.clone();
        let Some(format) = ArchiveFormat::from_path(&archive) else {
            tracing::debug!(target: "filedeck::ops", path = %archive.display(), "not an archive");
            return None;
        };

        let tracker = ProcessTracker::register(&self.ctx, OperationKind::Extract, &archive, 1);
        Some(self.spawn(tracker, move |_, tracker| extract_archive(tracker, archive, format)))
    }

    /// Zip the entry under the cursor.
    pub fn compress_under_cursor(&self, panel: &Panel) -> Option<BatchHandle> {
        let source = panel.current()?.location.clone();
        let tracker = ProcessTracker::register(&self.ctx, OperationKind::Compress, &source, 0);
        Some(self.spawn(tracker, move |_, tracker| compress_path(tracker, source)))
    }

    /// Rename the entry under the cursor, updating the panel on success.
    ///
    /// Returns `Ok(None)` when the panel is empty and an error when the
    /// name is invalid; in both cases no process is created.
    pub async fn rename_item(&self, panel: &mut Panel, new_name: &str) -> Result<Option<Process>> {
        crate::naming::validate_filename(new_name)?;
        let Some(source) = panel.current().map(|e| e.location.clone()) else {
            return Ok(None);
        };

        let (process, path) = rename_entry(&self.ctx, &source, new_name).await;
        if path != source {
            if let Some(element) = panel.elements.get_mut(panel.cursor) {
                *element = PanelElement::new(path);
            }
        }
        Ok(Some(process))
    }

    /// Create a file, or a directory when `name` ends in `/`, in the
    /// panel's directory.
    pub async fn create_item(&self, panel: &Panel, name: &str) -> Result<Process> {
        let request = CreateRequest::parse(name)?;
        Ok(create_entry(&self.ctx, &panel.location, request).await)
    }

    /// Cancel a running batch. The batch stops before its next item.
    ///
    /// Returns false when `id` is unknown or already finished.
    pub fn cancel(&self, id: ProcessId) -> bool {
        match self.ctx.cancel_tokens.get(&id) {
            Some(token) => {
                token.cancel();
                tracing::debug!(target: "filedeck::ops", %id, "cancellation requested");
                true
            }
            None => false,
        }
    }

    fn spawn<F, Fut>(&self, tracker: ProcessTracker, work: F) -> BatchHandle
    where
        F: FnOnce(Arc<OpsContext>, ProcessTracker) -> Fut,
        Fut: std::future::Future<Output = Process> + Send + 'static,
    {
        let id = tracker.id();
        let task = tokio::spawn(work(Arc::clone(&self.ctx), tracker));
        BatchHandle { id, task }
    }
}

/// The first item that still exists. Items that vanished before a batch
/// starts are a validation failure, not a process failure.
fn first_existing(items: &[PathBuf]) -> Option<PathBuf> {
    items.iter().find(|p| occupied(p)).cloned()
}
