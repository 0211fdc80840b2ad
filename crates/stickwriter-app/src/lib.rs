//! stickwriter-app - Application state and orchestration for stickwriter
//!
//! This crate implements the TEA (The Elm Architecture) pattern for state
//! management: a pure reducer over [`AppState`], actions that drive a
//! [`stickwriter_backend::Backend`], the device poller, persisted
//! preferences and the [`Engine`] that ties them together.

pub mod actions;
pub mod config;
pub mod confirm_dialog;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod message;
pub mod poller;
pub mod process;
pub mod signals;
pub mod state;

// Re-export primary types
pub use config::Preferences;
pub use confirm_dialog::{ConfirmDialogState, WriteTarget};
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use poller::{DevicePoller, POLL_INTERVAL};
pub use state::{AppState, ChecksumVerdict};
