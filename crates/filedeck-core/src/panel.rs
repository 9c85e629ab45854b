//! Panel abstraction consumed by the operation handlers.

use std::fs;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// One entry of a panel listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelElement {
    pub name: CompactString,
    /// Absolute path of the entry.
    pub location: PathBuf,
}

impl PanelElement {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        let name = location
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy()))
            .unwrap_or_default();
        Self { name, location }
    }
}

/// A file panel: current directory, listing, cursor and multi-selection.
///
/// Owned by the interactive thread; background tasks never touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    /// Directory the panel shows.
    pub location: PathBuf,
    /// Ordered listing.
    pub elements: Vec<PanelElement>,
    /// Index into `elements`.
    pub cursor: usize,
    /// Selected paths in selection order.
    pub selected: Vec<PathBuf>,
}

impl Panel {
    /// Create an empty panel for a directory.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Create a panel with a listing.
    pub fn with_elements(location: impl Into<PathBuf>, elements: Vec<PanelElement>) -> Self {
        Self {
            location: location.into(),
            elements,
            ..Default::default()
        }
    }

    /// List a directory, sorted by name with directories first.
    pub fn read_dir(location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();
        let entries = fs::read_dir(&location).map_err(|e| EngineError::io(&location, e))?;

        let mut elements: Vec<(bool, PanelElement)> = entries
            .flatten()
            .map(|entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                (is_dir, PanelElement::new(entry.path()))
            })
            .collect();
        elements.sort_by(|(a_dir, a), (b_dir, b)| b_dir.cmp(a_dir).then_with(|| a.name.cmp(&b.name)));

        Ok(Self::with_elements(
            location,
            elements.into_iter().map(|(_, e)| e).collect(),
        ))
    }

    /// Element under the cursor.
    pub fn current(&self) -> Option<&PanelElement> {
        self.elements.get(self.cursor)
    }

    /// Index of the element at `path`.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.elements.iter().position(|e| e.location == path)
    }

    /// Paths an action applies to: the selection, or the cursor element.
    pub fn targets(&self) -> Vec<PathBuf> {
        if !self.selected.is_empty() {
            return self.selected.clone();
        }
        self.current()
            .map(|e| vec![e.location.clone()])
            .unwrap_or_default()
    }

    /// Toggle a path in the selection.
    pub fn toggle_selected(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(i) = self.selected.iter().position(|p| *p == path) {
            self.selected.remove(i);
        } else {
            self.selected.push(path);
        }
    }

    /// Clear the selection and clamp the cursor to a listing that will
    /// shrink by `removed` entries.
    pub fn settle_after_removal(&mut self, removed: usize) {
        let remaining = self.elements.len().saturating_sub(removed);
        if self.cursor >= remaining {
            self.cursor = remaining.saturating_sub(1);
        }
        self.selected.clear();
    }

    /// Clamp the cursor to the current listing.
    pub fn clamp_cursor(&mut self) {
        if self.cursor >= self.elements.len() {
            self.cursor = self.elements.len().saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(n: usize) -> Panel {
        let elements = (0..n)
            .map(|i| PanelElement::new(format!("/d/f{i}")))
            .collect();
        Panel::with_elements("/d", elements)
    }

    #[test]
    fn test_targets_prefers_selection() {
        let mut p = panel(3);
        p.cursor = 2;
        assert_eq!(p.targets(), vec![PathBuf::from("/d/f2")]);

        p.toggle_selected("/d/f1");
        p.toggle_selected("/d/f0");
        assert_eq!(p.targets(), vec![PathBuf::from("/d/f1"), PathBuf::from("/d/f0")]);

        p.toggle_selected("/d/f1");
        assert_eq!(p.targets(), vec![PathBuf::from("/d/f0")]);
    }

    #[test]
    fn test_settle_clamps_cursor() {
        let mut p = panel(5);
        p.cursor = 4;
        p.selected = vec![PathBuf::from("/d/f3"), PathBuf::from("/d/f4")];
        p.settle_after_removal(2);
        assert_eq!(p.cursor, 2);
        assert!(p.selected.is_empty());

        let mut p = panel(1);
        p.settle_after_removal(1);
        assert_eq!(p.cursor, 0);
    }

    #[test]
    fn test_settle_keeps_cursor_in_range() {
        let mut p = panel(5);
        p.cursor = 1;
        p.settle_after_removal(1);
        assert_eq!(p.cursor, 1);
    }

    #[test]
    fn test_element_name() {
        let e = PanelElement::new("/home/user/notes.md");
        assert_eq!(e.name, "notes.md");
    }
}
