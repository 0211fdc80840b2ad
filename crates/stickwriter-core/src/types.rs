//! Core domain types for stickwriter

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::format::format_size;

// ─────────────────────────────────────────────────────────────────────────────
// Devices & Images
// ─────────────────────────────────────────────────────────────────────────────

/// A removable block device reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockDevice {
    /// System path, e.g. `/dev/sdb`. Identity of the device across enumerations.
    pub path: String,

    /// Human-readable name (vendor + model when available)
    pub name: String,

    /// Capacity in bytes
    pub size: u64,

    /// Capacity formatted for display
    pub size_human: String,

    #[serde(default)]
    pub removable: bool,

    /// Mount points of the device and its partitions
    #[serde(default)]
    pub mount_points: Vec<String>,
}

impl BlockDevice {
    /// Build a device, deriving `size_human` from `size`
    pub fn new(path: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            size_human: format_size(size),
            removable: true,
            mount_points: Vec::new(),
        }
    }
}

/// Metadata for a selected source image
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub size_human: String,
}

/// Verdict of an image format check
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageValidation {
    pub is_valid: bool,
    /// Detected format label (e.g. "iso9660", "gpt", "unknown")
    pub format: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Write Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Phase tag carried by backend progress events.
///
/// Ordered: `Writing < Verifying`. The backend never goes back to writing once
/// verification has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Writing,
    Verifying,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Writing => "writing",
            ProgressPhase::Verifying => "verifying",
        }
    }
}

impl From<ProgressPhase> for WritePhase {
    fn from(phase: ProgressPhase) -> Self {
        match phase {
            ProgressPhase::Writing => WritePhase::Writing,
            ProgressPhase::Verifying => WritePhase::Verifying,
        }
    }
}

/// A single `write-progress` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WriteProgress {
    pub phase: ProgressPhase,
    pub bytes_written: u64,
    pub total_bytes: u64,
    pub speed_bps: u64,
    pub eta_seconds: u64,
}

impl WriteProgress {
    /// Completion percentage, rounded to the nearest integer.
    ///
    /// Returns 0 when `total_bytes` is 0.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 0;
        }
        let pct = (self.bytes_written as f64 / self.total_bytes as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Lifecycle phase of a write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePhase {
    #[default]
    Idle,
    Preparing,
    Writing,
    Verifying,
    Complete,
    Error,
}

impl WritePhase {
    /// True while the backend owns the device (preparing, writing, verifying)
    pub fn is_writing(&self) -> bool {
        matches!(
            self,
            WritePhase::Preparing | WritePhase::Writing | WritePhase::Verifying
        )
    }

    /// True for the terminal phases that only a reset can leave
    pub fn is_finished(&self) -> bool {
        matches!(self, WritePhase::Complete | WritePhase::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WritePhase::Idle => "idle",
            WritePhase::Preparing => "preparing",
            WritePhase::Writing => "writing",
            WritePhase::Verifying => "verifying",
            WritePhase::Complete => "complete",
            WritePhase::Error => "error",
        }
    }
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Checksums
// ─────────────────────────────────────────────────────────────────────────────

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Md5,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Md5 => "md5",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha256 => "SHA-256",
            ChecksumAlgorithm::Md5 => "MD5",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            "md5" => Ok(ChecksumAlgorithm::Md5),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preferences enums
// ─────────────────────────────────────────────────────────────────────────────

/// Display theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(Error::config(format!("unknown theme '{}'", other))),
        }
    }
}

/// Operating mode. Advanced enables image validation and post-write actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    #[default]
    Standard,
    Advanced,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Standard => "standard",
            AppMode::Advanced => "advanced",
        }
    }

    pub fn is_advanced(&self) -> bool {
        matches!(self, AppMode::Advanced)
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(AppMode::Standard),
            "advanced" => Ok(AppMode::Advanced),
            other => Err(Error::config(format!("unknown mode '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(phase: ProgressPhase, bytes_written: u64, total_bytes: u64) -> WriteProgress {
        WriteProgress {
            phase,
            bytes_written,
            total_bytes,
            speed_bps: 0,
            eta_seconds: 0,
        }
    }

    #[test]
    fn test_percent_quarter() {
        assert_eq!(progress(ProgressPhase::Writing, 512, 2048).percent(), 25);
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(progress(ProgressPhase::Writing, 512, 0).percent(), 0);
    }

    #[test]
    fn test_percent_rounds_to_nearest() {
        // 2/3 = 66.67%
        assert_eq!(progress(ProgressPhase::Verifying, 2, 3).percent(), 67);
        // 1/3 = 33.33%
        assert_eq!(progress(ProgressPhase::Verifying, 1, 3).percent(), 33);
    }

    #[test]
    fn test_progress_phase_is_ordered() {
        assert!(ProgressPhase::Writing < ProgressPhase::Verifying);
    }

    #[test]
    fn test_write_phase_is_writing() {
        assert!(!WritePhase::Idle.is_writing());
        assert!(WritePhase::Preparing.is_writing());
        assert!(WritePhase::Writing.is_writing());
        assert!(WritePhase::Verifying.is_writing());
        assert!(!WritePhase::Complete.is_writing());
        assert!(!WritePhase::Error.is_writing());
    }

    #[test]
    fn test_write_phase_is_finished() {
        assert!(WritePhase::Complete.is_finished());
        assert!(WritePhase::Error.is_finished());
        assert!(!WritePhase::Verifying.is_finished());
    }

    #[test]
    fn test_progress_event_wire_format() {
        let json = r#"{"phase":"verifying","bytes_written":10,"total_bytes":100,"speed_bps":5,"eta_seconds":18}"#;
        let event: WriteProgress = serde_json::from_str(json).unwrap();
        assert_eq!(event.phase, ProgressPhase::Verifying);
        assert_eq!(event.bytes_written, 10);
        assert_eq!(event.eta_seconds, 18);
    }

    #[test]
    fn test_checksum_algorithm_from_str() {
        assert_eq!(
            "SHA256".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::Sha256
        );
        assert_eq!("md5".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Md5);
        assert!("crc32".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn test_theme_and_mode_from_str() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("blue".parse::<Theme>().is_err());
        assert_eq!("advanced".parse::<AppMode>().unwrap(), AppMode::Advanced);
        assert!("expert".parse::<AppMode>().is_err());
    }

    #[test]
    fn test_block_device_new_formats_size() {
        let device = BlockDevice::new("/dev/sdb", "SanDisk Ultra", 16 * 1024 * 1024 * 1024);
        assert_eq!(device.size_human, "16.0 GB");
        assert!(device.removable);
        assert!(device.mount_points.is_empty());
    }
}
