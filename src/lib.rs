//! stickwriter Library
//!
//! Command-line front-end over the stickwriter engine. Every command reports
//! progress as NDJSON events on stdout.

pub mod headless;

pub use headless::runner::{
    run_checksum, run_devices, run_settings, run_validate, run_write, Confirmation,
    SettingsUpdate, WriteOptions,
};
pub use headless::HeadlessEvent;
