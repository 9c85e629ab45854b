//! File operation engine for filedeck.
//!
//! Batch operations (trash, delete, paste, extract, compress) run as tokio
//! tasks that report progress as full [`Process`](filedeck_core::Process)
//! snapshots over a bounded [`MessageBus`]. Create and rename run inline.

mod archive;
mod archive_op;
mod bus;
mod clipboard;
mod copy;
mod create;
mod delete;
mod engine;
mod naming;
mod paste;
mod paths;
mod rename;
mod tracker;
mod trash;

pub use archive::{compress, extract, extraction_dir, strip_archive_suffix, zip_entry_count, ArchiveFormat};
pub use bus::{channel, MessageBus, MessageReceiver, Registry};
pub use clipboard::{ArboardClipboard, ClipboardStage, SystemClipboard};
pub use copy::{copy_recursive, copy_then_remove, remove_path, rename_path};
pub use engine::{BatchHandle, Engine};
pub use naming::{disambiguate, resolve_collision_free_name, validate_filename};
pub use paths::{count_batch, count_files, is_external_volume};
pub use trash::{permanently_delete, TrashCan, TrashedItem};
