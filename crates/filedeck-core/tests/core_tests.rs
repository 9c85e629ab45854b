use filedeck_core::{
    ConfirmationRequest, EngineConfig, EngineError, Message, MessageKind, OperationKind, Panel,
    PanelElement, PendingAction, Process, ProcessId, ProcessState, WarnKind,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_process_lifecycle() {
    let mut process = Process::new(ProcessId::new(7), OperationKind::Copy, Path::new("/src/a.txt"), 4);
    assert_eq!(process.state, ProcessState::InProgress);
    assert!(process.name.ends_with("a.txt"));
    assert!(process.done_time.is_none());

    process.advance(1);
    process.set_current(Path::new("/src/b.txt"));
    process.advance(1);
    assert_eq!(process.done, 2);
    assert!(process.name.ends_with("b.txt"));

    process.succeed().unwrap();
    assert_eq!(process.state, ProcessState::Successful);
    assert_eq!(process.done, process.total);
    assert!(process.done_time.is_some());

    // Terminal states are final.
    assert!(matches!(process.fail(), Err(EngineError::AlreadyFinished { .. })));
    assert_eq!(process.state, ProcessState::Successful);
}

#[test]
fn test_failed_process_keeps_partial_progress() {
    let mut process = Process::new(ProcessId::new(1), OperationKind::Trash, Path::new("/x"), 5);
    process.advance(2);
    process.fail().unwrap();

    assert_eq!(process.state, ProcessState::Failure);
    assert_eq!(process.done, 2);
    assert!(process.succeed().is_err());
}

#[test]
fn test_confirmation_message_roundtrip() {
    let request = ConfirmationRequest::permanent(vec![PathBuf::from("/mnt/usb/photo.jpg")]);
    assert_eq!(request.kind, WarnKind::ConfirmPermanentDelete);
    assert_eq!(request.action.paths(), [PathBuf::from("/mnt/usb/photo.jpg")]);

    let message = Message::confirmation(ProcessId::new(3), request.clone());
    assert_eq!(message.kind(), MessageKind::ConfirmationRequest);
    assert!(message.as_process().is_none());
    assert!(!message.is_terminal());

    let json = serde_json::to_string(&message).unwrap();
    let decoded: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn test_trash_confirmation_carries_trash_action() {
    let request = ConfirmationRequest::trash(vec![PathBuf::from("/home/me/a")]);
    assert_eq!(request.kind, WarnKind::ConfirmDelete);
    assert!(matches!(request.action, PendingAction::TrashItems { .. }));
}

#[test]
fn test_process_message_terminal_flag() {
    let mut process = Process::new(ProcessId::new(2), OperationKind::Extract, Path::new("/a.zip"), 1);
    assert!(!Message::process(process.clone()).is_terminal());
    process.succeed().unwrap();

    let message = Message::process(process);
    assert_eq!(message.kind(), MessageKind::ProcessUpdate);
    assert!(message.is_terminal());
}

#[test]
fn test_panel_read_dir_orders_directories_first() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::create_dir(dir.path().join("zeta")).unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();

    let panel = Panel::read_dir(dir.path()).unwrap();
    let names: Vec<&str> = panel.elements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "a.txt", "b.txt"]);
    assert_eq!(panel.targets(), vec![dir.path().join("zeta")]);
}

#[test]
fn test_panel_read_dir_missing() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Panel::read_dir(dir.path().join("missing")),
        Err(EngineError::NotFound { .. })
    ));
}

#[test]
fn test_panel_settle_after_removing_last_entries() {
    let mut panel = Panel::with_elements(
        "/work",
        vec![
            PanelElement::new("/work/a"),
            PanelElement::new("/work/b"),
            PanelElement::new("/work/c"),
        ],
    );
    panel.cursor = 2;
    panel.toggle_selected("/work/b");
    panel.toggle_selected("/work/c");

    panel.settle_after_removal(2);
    assert_eq!(panel.cursor, 0);
    assert!(panel.selected.is_empty());
}

#[test]
fn test_config_builder_validation() {
    let config = EngineConfig::builder()
        .bus_capacity(32usize)
        .tick_threshold(4usize)
        .trash_root("/tmp/filedeck-trash")
        .build()
        .unwrap();
    assert_eq!(config.bus_capacity, 32);
    assert_eq!(config.trash_root, PathBuf::from("/tmp/filedeck-trash"));

    assert!(EngineConfig::builder().tick_threshold(0usize).build().is_err());
    assert!(
        EngineConfig::builder()
            .bus_capacity(5usize)
            .tick_threshold(5usize)
            .build()
            .is_err()
    );
}

#[test]
fn test_config_from_json() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"trash_root": "/srv/trash", "bus_capacity": 64}"#).unwrap();
    assert_eq!(config.trash_root, PathBuf::from("/srv/trash"));
    assert_eq!(config.bus_capacity, 64);
    assert_eq!(config.tick_threshold, 5);
}
