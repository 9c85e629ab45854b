//! Messages announced to the renderer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{Process, ProcessId};

/// What a confirmation modal is warning about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum WarnKind {
    /// Items will be moved to the trash.
    ConfirmDelete,
    /// Items will be removed without a trash copy.
    ConfirmPermanentDelete,
}

/// The continuation a confirmation modal runs on an affirmative answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingAction {
    /// Move the listed paths to the trash.
    TrashItems { paths: Vec<PathBuf> },
    /// Permanently delete the listed paths.
    DeleteItems { paths: Vec<PathBuf> },
}

impl PendingAction {
    /// Paths the action applies to, in selection order.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::TrashItems { paths } | Self::DeleteItems { paths } => paths,
        }
    }
}

/// A yes/no gate shown before a destructive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub title: String,
    pub body: String,
    pub kind: WarnKind,
    /// What to run when the user confirms.
    pub action: PendingAction,
}

impl ConfirmationRequest {
    /// Confirmation for moving items to the trash.
    pub fn trash(paths: Vec<PathBuf>) -> Self {
        Self {
            title: "Are you sure you want to move this to trash can".to_string(),
            body: "This operation will move file or directory to trash can.".to_string(),
            kind: WarnKind::ConfirmDelete,
            action: PendingAction::TrashItems { paths },
        }
    }

    /// Confirmation for permanent deletion.
    pub fn permanent(paths: Vec<PathBuf>) -> Self {
        Self {
            title: "Are you sure you want to completely delete".to_string(),
            body: "This operation cannot be undone and your data will be completely lost."
                .to_string(),
            kind: WarnKind::ConfirmPermanentDelete,
            action: PendingAction::DeleteItems { paths },
        }
    }
}

/// Discriminant of a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum MessageKind {
    ProcessUpdate,
    ConfirmationRequest,
}

/// Payload carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagePayload {
    /// Full snapshot of a process.
    Process(Process),
    /// A confirmation the renderer must show.
    Confirmation(ConfirmationRequest),
}

/// An immutable event on the message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: ProcessId,
    pub payload: MessagePayload,
}

impl Message {
    /// Announce a process snapshot.
    pub fn process(process: Process) -> Self {
        Self {
            id: process.id,
            payload: MessagePayload::Process(process),
        }
    }

    /// Announce a confirmation request.
    pub fn confirmation(id: ProcessId, request: ConfirmationRequest) -> Self {
        Self {
            id,
            payload: MessagePayload::Confirmation(request),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self.payload {
            MessagePayload::Process(_) => MessageKind::ProcessUpdate,
            MessagePayload::Confirmation(_) => MessageKind::ConfirmationRequest,
        }
    }

    /// The process snapshot, if this is a process update.
    pub fn as_process(&self) -> Option<&Process> {
        match &self.payload {
            MessagePayload::Process(p) => Some(p),
            MessagePayload::Confirmation(_) => None,
        }
    }

    /// Whether this message announces a terminal process state.
    pub fn is_terminal(&self) -> bool {
        self.as_process().is_some_and(Process::is_finished)
    }
}
