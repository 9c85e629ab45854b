//! Process records for user-visible operations.

use std::path::Path;

use chrono::{DateTime, Utc};
use compact_str::{format_compact, CompactString};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{EngineError, Result};

/// Unique identifier for a process (and for the messages announcing it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl ProcessId {
    /// Create a new ProcessId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a process.
///
/// `InProgress` may move to exactly one of the terminal states; terminal
/// states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum ProcessState {
    #[default]
    #[strum(to_string = "in progress")]
    InProgress,
    #[strum(to_string = "successful")]
    Successful,
    #[strum(to_string = "failure")]
    Failure,
}

impl ProcessState {
    /// Whether this state is final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// The action a process performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum OperationKind {
    #[strum(to_string = "Trash")]
    Trash,
    #[strum(to_string = "Delete")]
    Delete,
    #[strum(to_string = "Copy")]
    Copy,
    #[strum(to_string = "Cut")]
    Cut,
    #[strum(to_string = "Extract")]
    Extract,
    #[strum(to_string = "Compress")]
    Compress,
    #[strum(to_string = "Rename")]
    Rename,
    #[strum(to_string = "Create")]
    Create,
}

impl OperationKind {
    /// Nerd-font glyph shown before the item name.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Trash => "\u{f01b4}",
            Self::Delete => "\u{f05e8}",
            Self::Copy => "\u{f018f}",
            Self::Cut => "\u{f0190}",
            Self::Extract => "\u{f06eb}",
            Self::Compress => "\u{f05c4}",
            Self::Rename => "\u{f0cb6}",
            Self::Create => "\u{f0415}",
        }
    }
}

/// One user-visible operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Stable identifier.
    pub id: ProcessId,
    /// The action performed.
    pub kind: OperationKind,
    /// Icon plus the basename of the item currently being processed.
    pub name: CompactString,
    /// Lifecycle state.
    pub state: ProcessState,
    /// Number of units (items or files) the operation will process.
    pub total: usize,
    /// Number of units processed so far. Never exceeds `total`.
    pub done: usize,
    /// Set when the process enters a terminal state.
    pub done_time: Option<DateTime<Utc>>,
}

impl Process {
    /// Create an in-progress process labelled with the first item.
    pub fn new(id: ProcessId, kind: OperationKind, first_item: &Path, total: usize) -> Self {
        Self {
            id,
            kind,
            name: label(kind, first_item),
            state: ProcessState::InProgress,
            total,
            done: 0,
            done_time: None,
        }
    }

    /// Relabel the process with the item now being processed.
    pub fn set_current(&mut self, item: &Path) {
        self.name = label(self.kind, item);
    }

    /// Count `n` more processed units, saturating at `total`.
    pub fn advance(&mut self, n: usize) {
        self.done = self.done.saturating_add(n).min(self.total);
    }

    /// Enter the successful state, correcting `done` to `total`.
    pub fn succeed(&mut self) -> Result<()> {
        self.finish(ProcessState::Successful)?;
        self.done = self.total;
        Ok(())
    }

    /// Enter the failure state.
    pub fn fail(&mut self) -> Result<()> {
        self.finish(ProcessState::Failure)
    }

    fn finish(&mut self, state: ProcessState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(EngineError::AlreadyFinished { id: self.id });
        }
        self.state = state;
        self.done_time = Some(Utc::now());
        Ok(())
    }

    /// Whether the process reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.done as f64 / self.total as f64) * 100.0
        } else if self.state == ProcessState::Successful {
            100.0
        } else {
            0.0
        }
    }
}

fn label(kind: OperationKind, item: &Path) -> CompactString {
    let base = item
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| item.to_string_lossy());
    format_compact!("{} {}", kind.icon(), base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(total: usize) -> Process {
        Process::new(ProcessId::new(1), OperationKind::Copy, Path::new("/tmp/a.txt"), total)
    }

    #[test]
    fn test_label_uses_basename() {
        let p = sample(3);
        assert!(p.name.ends_with(" a.txt"));
        assert!(p.name.starts_with(OperationKind::Copy.icon()));
    }

    #[test]
    fn test_advance_never_exceeds_total() {
        let mut p = sample(2);
        p.advance(1);
        p.advance(5);
        assert_eq!(p.done, 2);
    }

    #[test]
    fn test_single_terminal_transition() {
        let mut p = sample(4);
        p.advance(1);
        p.succeed().unwrap();
        assert_eq!(p.done, 4);
        assert!(p.done_time.is_some());
        assert!(matches!(p.fail(), Err(EngineError::AlreadyFinished { .. })));
        assert_eq!(p.state, ProcessState::Successful);
    }

    #[test]
    fn test_failure_keeps_done() {
        let mut p = sample(5);
        p.advance(2);
        p.fail().unwrap();
        assert_eq!(p.done, 2);
        assert_eq!(p.state, ProcessState::Failure);
        assert!(p.succeed().is_err());
    }

    #[test]
    fn test_percentage() {
        let mut p = sample(4);
        p.advance(1);
        assert_eq!(p.percentage(), 25.0);

        let mut empty = sample(0);
        assert_eq!(empty.percentage(), 0.0);
        empty.succeed().unwrap();
        assert_eq!(empty.percentage(), 100.0);
    }
}
