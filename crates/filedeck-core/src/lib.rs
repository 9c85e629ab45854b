//! Core types for filedeck.
//!
//! This crate provides the data model shared by the operation engine and
//! whatever renders it: process records, bus messages, confirmation
//! requests, the panel abstraction, and engine configuration.

mod config;
mod error;
mod message;
mod panel;
mod process;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{EngineError, Result};
pub use message::{ConfirmationRequest, Message, MessageKind, MessagePayload, PendingAction, WarnKind};
pub use panel::{Panel, PanelElement};
pub use process::{OperationKind, Process, ProcessId, ProcessState};
