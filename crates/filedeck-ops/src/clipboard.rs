//! Clipboard stage: the pending set for copy/cut, plus best-effort
//! mirroring of small text files to the system clipboard.

use std::fs;
use std::path::{Path, PathBuf};

use filedeck_core::{EngineError, Result};

/// Destination for mirrored file content.
pub trait SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<()>;
}

/// System clipboard backed by `arboard`.
///
/// The connection is opened on first use, so constructing this on a
/// headless machine never fails.
#[derive(Default)]
pub struct ArboardClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard for ArboardClipboard {
    fn set_text(&mut self, text: String) -> Result<()> {
        let clipboard = match &mut self.inner {
            Some(clipboard) => clipboard,
            slot => slot.insert(arboard::Clipboard::new().map_err(clipboard_error)?),
        };
        clipboard.set_text(text).map_err(clipboard_error)
    }
}

fn clipboard_error(e: arboard::Error) -> EngineError {
    EngineError::Clipboard {
        message: e.to_string(),
    }
}

/// Paths staged by the last copy or cut action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardStage {
    items: Vec<PathBuf>,
    cut: bool,
}

impl ClipboardStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending set.
    ///
    /// A single regular file smaller than `mirror_limit` bytes is also
    /// copied to `system` as text. Mirroring failures are logged only.
    pub fn stage(
        &mut self,
        paths: Vec<PathBuf>,
        cut: bool,
        system: &mut dyn SystemClipboard,
        mirror_limit: u64,
    ) {
        self.items = paths;
        self.cut = cut;

        if let [only] = self.items.as_slice() {
            if let Err(e) = mirror(only, system, mirror_limit) {
                tracing::warn!(target: "filedeck::ops", path = %only.display(), error = %e, "clipboard mirroring failed");
            }
        }
    }

    /// Take the staged set, leaving the stage empty.
    pub fn take_all(&mut self) -> (Vec<PathBuf>, bool) {
        let cut = std::mem::take(&mut self.cut);
        (std::mem::take(&mut self.items), cut)
    }

    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }

    pub fn is_cut(&self) -> bool {
        self.cut
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn mirror(path: &Path, system: &mut dyn SystemClipboard, limit: u64) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| EngineError::io(path, e))?;
    if !metadata.is_file() || metadata.len() >= limit {
        return Ok(());
    }

    let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
    // The system clipboard is text-only through arboard, and a lossy
    // conversion would paste something other than the file's bytes.
    let text = String::from_utf8(bytes).map_err(|_| EngineError::Clipboard {
        message: format!("{} is not valid UTF-8", path.display()),
    })?;
    system.set_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl SystemClipboard for Recorder {
        fn set_text(&mut self, text: String) -> Result<()> {
            self.0.push(text);
            Ok(())
        }
    }

    struct Broken;

    impl SystemClipboard for Broken {
        fn set_text(&mut self, _text: String) -> Result<()> {
            Err(EngineError::Clipboard {
                message: "no display".to_string(),
            })
        }
    }

    #[test]
    fn test_stage_replaces_previous_set() {
        let mut stage = ClipboardStage::new();
        let mut system = Recorder::default();
        stage.stage(vec!["/a".into(), "/b".into()], true, &mut system, 10);
        stage.stage(vec!["/c".into()], false, &mut system, 10);

        assert_eq!(stage.items(), [PathBuf::from("/c")]);
        assert!(!stage.is_cut());
    }

    #[test]
    fn test_take_all_clears() {
        let mut stage = ClipboardStage::new();
        stage.stage(vec!["/a".into(), "/b".into()], true, &mut Recorder::default(), 10);

        let (items, cut) = stage.take_all();
        assert_eq!(items.len(), 2);
        assert!(cut);
        assert!(stage.is_empty());
        assert_eq!(stage.take_all(), (Vec::new(), false));
    }

    #[test]
    fn test_directories_and_multiple_items_are_not_mirrored() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let mut system = Recorder::default();
        let mut stage = ClipboardStage::new();
        stage.stage(vec![dir.path().to_path_buf()], false, &mut system, 1024);
        stage.stage(vec![a, b], false, &mut system, 1024);
        assert!(system.0.is_empty());
    }

    #[test]
    fn test_mirror_failure_still_stages() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.txt");
        fs::write(&file, "hello").unwrap();

        let mut stage = ClipboardStage::new();
        stage.stage(vec![file.clone()], false, &mut Broken, 1024);
        assert_eq!(stage.items(), [file]);
    }

    #[test]
    fn test_file_at_limit_is_not_mirrored() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("ten.txt");
        fs::write(&file, "0123456789").unwrap();

        let mut system = Recorder::default();
        ClipboardStage::new().stage(vec![file.clone()], false, &mut system, 10);
        assert!(system.0.is_empty());

        ClipboardStage::new().stage(vec![file], false, &mut system, 11);
        assert_eq!(system.0, vec!["0123456789".to_string()]);
    }

    #[test]
    fn test_binary_file_is_not_mirrored() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("blob.bin");
        fs::write(&file, [0xff, 0xfe, 0x00]).unwrap();

        let mut system = Recorder::default();
        ClipboardStage::new().stage(vec![file], false, &mut system, 1024);
        assert!(system.0.is_empty());
    }
}
