//! Domain events emitted by the Engine for external consumers
//!
//! Front-ends subscribe via `Engine::subscribe()`. Events are broadcast after
//! each message processing cycle, derived from before/after state snapshots.

use std::path::PathBuf;

use stickwriter_core::{
    BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, Theme, WritePhase, WriteProgress,
};

#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Write Lifecycle
    // ─────────────────────────────────────────────────────────
    /// The write phase changed
    PhaseChanged {
        old_phase: WritePhase,
        new_phase: WritePhase,
    },

    /// A new progress snapshot was stored
    Progress { progress: WriteProgress, percent: u8 },

    /// The user must confirm before the write starts
    ConfirmationRequested { title: String, message: String },

    WriteCompleted { device_path: Option<String> },

    WriteFailed { error: String },

    /// A write finished and notifications are enabled
    Notification { title: String, body: String },

    // ─────────────────────────────────────────────────────────
    // Devices & Image
    // ─────────────────────────────────────────────────────────
    /// The device set was replaced
    DevicesUpdated { devices: Vec<BlockDevice> },

    /// The selected device disappeared from the latest enumeration
    SelectionCleared { device_path: String },

    ImageSelected { info: FileInfo },

    ValidationCompleted {
        path: PathBuf,
        result: ImageValidation,
    },

    ChecksumCalculated {
        algorithm: ChecksumAlgorithm,
        digest: String,
        /// `None` when there is nothing to compare against
        matches: Option<bool>,
    },

    // ─────────────────────────────────────────────────────────
    // Preferences
    // ─────────────────────────────────────────────────────────
    ThemeApplied { theme: Theme },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::Progress { .. } => "progress",
            Self::ConfirmationRequested { .. } => "confirmation_requested",
            Self::WriteCompleted { .. } => "write_completed",
            Self::WriteFailed { .. } => "write_failed",
            Self::Notification { .. } => "notification",
            Self::DevicesUpdated { .. } => "devices_updated",
            Self::SelectionCleared { .. } => "selection_cleared",
            Self::ImageSelected { .. } => "image_selected",
            Self::ValidationCompleted { .. } => "validation_completed",
            Self::ChecksumCalculated { .. } => "checksum_calculated",
            Self::ThemeApplied { .. } => "theme_applied",
            Self::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_type_labels() {
        let event = EngineEvent::Shutdown;
        assert_eq!(event.event_type(), "shutdown");

        let event = EngineEvent::PhaseChanged {
            old_phase: WritePhase::Idle,
            new_phase: WritePhase::Preparing,
        };
        assert_eq!(event.event_type(), "phase_changed");

        let event = EngineEvent::ThemeApplied { theme: Theme::Dark };
        assert_eq!(event.event_type(), "theme_applied");
    }

    #[test]
    fn test_engine_event_clone() {
        let event = EngineEvent::WriteFailed {
            error: "Permission denied".to_string(),
        };
        let cloned = event.clone();
        assert_eq!(cloned.event_type(), "write_failed");
    }
}
