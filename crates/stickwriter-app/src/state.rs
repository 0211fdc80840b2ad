//! Application state (Model in TEA pattern)

use std::path::{Path, PathBuf};

use stickwriter_core::{
    AppMode, BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, WritePhase, WriteProgress,
};

use crate::config::Preferences;
use crate::confirm_dialog::ConfirmDialogState;

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

/// Latest enumeration result
#[derive(Debug, Clone, Default)]
pub struct DeviceListState {
    pub devices: Vec<BlockDevice>,

    /// An enumeration is in flight
    pub loading: bool,

    /// Bumped every time the set is replaced
    pub generation: u64,
}

impl DeviceListState {
    pub fn find(&self, path: &str) -> Option<&BlockDevice> {
        self.devices.iter().find(|d| d.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Replace the set wholesale
    pub fn replace(&mut self, devices: Vec<BlockDevice>) {
        self.devices = devices;
        self.loading = false;
        self.generation += 1;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a validation request: one per (image, mode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationKey {
    pub path: PathBuf,
    pub mode: AppMode,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    pub result: Option<(ValidationKey, ImageValidation)>,
    pub pending: Option<ValidationKey>,
}

impl ValidationState {
    pub fn result(&self) -> Option<&ImageValidation> {
        self.result.as_ref().map(|(_, result)| result)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.result = None;
        self.pending = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Checksum
// ─────────────────────────────────────────────────────────────────────────────

/// Result of comparing the calculated digest with the expected text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumVerdict {
    Match,
    Mismatch,
}

/// Identity of a checksum request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRequest {
    pub path: PathBuf,
    pub algorithm: ChecksumAlgorithm,
}

#[derive(Debug, Clone, Default)]
pub struct ChecksumState {
    /// Digest of the selected image under `algorithm`
    pub calculated: Option<String>,
    pub algorithm: ChecksumAlgorithm,
    /// User-supplied digest text
    pub expected: String,
    pub pending: Option<ChecksumRequest>,
}

impl ChecksumState {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Compare case-insensitively. `None` unless both sides are non-empty.
    pub fn verdict(&self) -> Option<ChecksumVerdict> {
        let calculated = self.calculated.as_deref()?.trim();
        let expected = self.expected.trim();
        if calculated.is_empty() || expected.is_empty() {
            return None;
        }

        if calculated.eq_ignore_ascii_case(expected) {
            Some(ChecksumVerdict::Match)
        } else {
            Some(ChecksumVerdict::Mismatch)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Write Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct WriteState {
    pub phase: WritePhase,
    pub progress: Option<WriteProgress>,
    pub error: Option<String>,

    /// Device path of the current / last write
    pub target_device: Option<String>,
}

impl WriteState {
    pub fn is_writing(&self) -> bool {
        self.phase.is_writing()
    }

    /// Completion percentage of the last progress event
    pub fn percent(&self) -> u8 {
        self.progress.map(|p| p.percent()).unwrap_or(0)
    }

    /// One-line status for the current phase
    pub fn status_message(&self) -> String {
        match self.phase {
            WritePhase::Idle => String::new(),
            WritePhase::Preparing => "Preparing to write...".to_string(),
            WritePhase::Writing => "Writing to USB...".to_string(),
            WritePhase::Verifying => "Verifying written data...".to_string(),
            WritePhase::Complete => "Complete! You can safely remove the USB drive.".to_string(),
            WritePhase::Error => self
                .error
                .clone()
                .unwrap_or_else(|| "An error occurred.".to_string()),
        }
    }

    /// Back to idle with no progress or error
    pub fn reset(&mut self) {
        self.phase = WritePhase::Idle;
        self.progress = None;
        self.error = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AppState
// ─────────────────────────────────────────────────────────────────────────────

/// Complete application state (the Model in TEA)
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub devices: DeviceListState,
    pub selected_device: Option<BlockDevice>,

    pub selected_image: Option<FileInfo>,
    /// Image whose metadata was last requested; older answers are stale
    pub image_pending: Option<PathBuf>,
    pub validation: ValidationState,
    pub checksum: ChecksumState,

    pub write: WriteState,

    /// Verify flag for the next write, seeded from preferences
    pub verify: bool,

    pub preferences: Preferences,

    /// Pending confirmation, if any
    pub confirm_dialog: Option<ConfirmDialogState>,

    should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_preferences(Preferences::default())
    }

    pub fn with_preferences(preferences: Preferences) -> Self {
        Self {
            verify: preferences.verify_after_write,
            preferences,
            ..Default::default()
        }
    }

    pub fn is_writing(&self) -> bool {
        self.write.is_writing()
    }

    /// Image and device selected, and no write in progress or unacknowledged
    pub fn can_write(&self) -> bool {
        self.selected_image.is_some()
            && self.selected_device.is_some()
            && self.write.phase == WritePhase::Idle
    }

    pub fn selected_image_path(&self) -> Option<&Path> {
        self.selected_image.as_ref().map(|i| i.path.as_path())
    }

    /// Key the next validation request would use, if the guard allows one
    pub fn validation_to_request(&self) -> Option<ValidationKey> {
        if !self.preferences.mode.is_advanced() {
            return None;
        }
        let key = ValidationKey {
            path: self.selected_image_path()?.to_path_buf(),
            mode: self.preferences.mode,
        };

        let has_result = self
            .validation
            .result
            .as_ref()
            .is_some_and(|(k, _)| *k == key);
        let in_flight = self.validation.pending.as_ref() == Some(&key);

        (!has_result && !in_flight).then_some(key)
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}
