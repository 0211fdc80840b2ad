//! Preference types

use serde::{Deserialize, Serialize};
use stickwriter_core::{AppMode, Theme};

/// User preferences persisted across sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Display theme
    pub theme: Theme,

    /// Read the device back after writing (default for new writes)
    pub verify_after_write: bool,

    /// Standard or advanced mode
    pub mode: AppMode,

    /// Eject the device after a successful write (advanced mode only)
    pub auto_eject: bool,

    /// Emit a notification when a write finishes
    pub show_notification: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            verify_after_write: true,
            mode: AppMode::Standard,
            auto_eject: false,
            show_notification: true,
        }
    }
}
