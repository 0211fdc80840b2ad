//! Headless mode - NDJSON event output
//!
//! Every command reports what happens as structured JSON events on stdout,
//! one per line, so scripts can follow a write without parsing prose. Logs
//! go to the log file, never to stdout.
//!
//! # Example Output
//!
//! ```json
//! {"event":"image_selected","path":"/images/debian.iso","name":"debian.iso","size":661651456,"size_human":"631.0 MB","timestamp":1704700001000}
//! {"event":"phase_changed","from":"idle","to":"preparing","timestamp":1704700002000}
//! {"event":"progress","phase":"writing","bytes_written":4194304,"total_bytes":661651456,"percent":1,"speed":"4.0 MB/s","eta":"2m 36s","timestamp":1704700003000}
//! ```

pub mod runner;

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use stickwriter_app::{EngineEvent, Preferences};
use stickwriter_core::{
    format_eta, format_speed, AppMode, BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation,
    ProgressPhase, Theme, WritePhase, WriteProgress,
};
use tracing::error;

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Result of one enumeration
    Devices {
        devices: Vec<BlockDevice>,
        timestamp: i64,
    },

    /// The selected device disappeared
    DeviceRemoved { device_path: String, timestamp: i64 },

    ImageSelected {
        path: String,
        name: String,
        size: u64,
        size_human: String,
        timestamp: i64,
    },

    Validation {
        path: String,
        is_valid: bool,
        format: String,
        errors: Vec<String>,
        warnings: Vec<String>,
        timestamp: i64,
    },

    Checksum {
        path: Option<String>,
        algorithm: ChecksumAlgorithm,
        digest: String,
        /// Absent when no expected digest was given
        matches: Option<bool>,
        timestamp: i64,
    },

    /// The write waits for an answer on stdin (`y` / `n`)
    ConfirmationRequired {
        title: String,
        message: String,
        timestamp: i64,
    },

    PhaseChanged {
        from: WritePhase,
        to: WritePhase,
        timestamp: i64,
    },

    Progress {
        phase: ProgressPhase,
        bytes_written: u64,
        total_bytes: u64,
        percent: u8,
        speed: String,
        eta: String,
        timestamp: i64,
    },

    WriteCompleted {
        device_path: Option<String>,
        timestamp: i64,
    },

    WriteFailed { error: String, timestamp: i64 },

    Ejected { device_path: String, timestamp: i64 },

    Notification {
        title: String,
        body: String,
        timestamp: i64,
    },

    ThemeApplied { theme: Theme, timestamp: i64 },

    Preferences {
        theme: Theme,
        verify_after_write: bool,
        mode: AppMode,
        auto_eject: bool,
        show_notification: bool,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn devices(devices: Vec<BlockDevice>) -> Self {
        Self::Devices {
            devices,
            timestamp: Self::now(),
        }
    }

    pub fn image_selected(info: &FileInfo) -> Self {
        Self::ImageSelected {
            path: info.path.display().to_string(),
            name: info.name.clone(),
            size: info.size,
            size_human: info.size_human.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn validation(path: &Path, result: &ImageValidation) -> Self {
        Self::Validation {
            path: path.display().to_string(),
            is_valid: result.is_valid,
            format: result.format.clone(),
            errors: result.errors.clone(),
            warnings: result.warnings.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn checksum(
        path: Option<&Path>,
        algorithm: ChecksumAlgorithm,
        digest: &str,
        matches: Option<bool>,
    ) -> Self {
        Self::Checksum {
            path: path.map(|p| p.display().to_string()),
            algorithm,
            digest: digest.to_string(),
            matches,
            timestamp: Self::now(),
        }
    }

    pub fn progress(progress: &WriteProgress) -> Self {
        Self::Progress {
            phase: progress.phase,
            bytes_written: progress.bytes_written,
            total_bytes: progress.total_bytes,
            percent: progress.percent(),
            speed: format_speed(progress.speed_bps),
            eta: format_eta(progress.eta_seconds),
            timestamp: Self::now(),
        }
    }

    pub fn ejected(device_path: &str) -> Self {
        Self::Ejected {
            device_path: device_path.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn preferences(prefs: &Preferences) -> Self {
        Self::Preferences {
            theme: prefs.theme,
            verify_after_write: prefs.verify_after_write,
            mode: prefs.mode,
            auto_eject: prefs.auto_eject,
            show_notification: prefs.show_notification,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Headless rendering of an engine event, if it has one
    pub fn from_engine_event(event: &EngineEvent) -> Option<Self> {
        let timestamp = Self::now();
        let event = match event {
            EngineEvent::DevicesUpdated { devices } => Self::Devices {
                devices: devices.clone(),
                timestamp,
            },
            EngineEvent::SelectionCleared { device_path } => Self::DeviceRemoved {
                device_path: device_path.clone(),
                timestamp,
            },
            EngineEvent::ImageSelected { info } => Self::image_selected(info),
            EngineEvent::ValidationCompleted { path, result } => Self::validation(path, result),
            EngineEvent::ChecksumCalculated {
                algorithm,
                digest,
                matches,
            } => Self::checksum(None, *algorithm, digest, *matches),
            EngineEvent::ConfirmationRequested { title, message } => Self::ConfirmationRequired {
                title: title.clone(),
                message: message.clone(),
                timestamp,
            },
            EngineEvent::PhaseChanged {
                old_phase,
                new_phase,
            } => Self::PhaseChanged {
                from: *old_phase,
                to: *new_phase,
                timestamp,
            },
            EngineEvent::Progress { progress, .. } => Self::progress(progress),
            EngineEvent::WriteCompleted { device_path } => Self::WriteCompleted {
                device_path: device_path.clone(),
                timestamp,
            },
            EngineEvent::WriteFailed { error } => Self::WriteFailed {
                error: error.clone(),
                timestamp,
            },
            EngineEvent::Notification { title, body } => Self::Notification {
                title: title.clone(),
                body: body.clone(),
                timestamp,
            },
            EngineEvent::ThemeApplied { theme } => Self::ThemeApplied {
                theme: *theme,
                timestamp,
            },
            EngineEvent::Shutdown => return None,
        };
        Some(event)
    }
}
