//! Message types for the application (TEA pattern)

use std::path::PathBuf;

use stickwriter_core::{
    AppMode, BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, Theme, WriteProgress,
};

/// All possible messages/actions in the application
#[derive(Debug, Clone)]
pub enum Message {
    /// Quit the application
    Quit,

    // ─────────────────────────────────────────────────────────
    // Device Discovery
    // ─────────────────────────────────────────────────────────
    /// Enumerate devices (poller tick or manual refresh)
    RefreshDevices,

    /// Enumeration succeeded
    DevicesListed { devices: Vec<BlockDevice> },

    /// Enumeration failed
    DeviceListFailed { error: String },

    /// Select a device from the latest enumeration by path
    SelectDevice { path: String },

    ClearDevice,

    // ─────────────────────────────────────────────────────────
    // Image Selection & Validation
    // ─────────────────────────────────────────────────────────
    /// A path was picked as the source image
    SelectImage { path: PathBuf },

    /// Image metadata arrived
    ImageInfoLoaded { info: FileInfo },

    /// Image metadata could not be read
    ImageInfoFailed { path: PathBuf, error: String },

    ClearImage,

    /// Request validation if the guard allows it
    RequestValidation,

    ValidationCompleted {
        path: PathBuf,
        result: ImageValidation,
    },

    ValidationFailed { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────
    // Checksum
    // ─────────────────────────────────────────────────────────
    SetChecksumAlgorithm { algorithm: ChecksumAlgorithm },

    /// User-supplied digest to compare against
    SetExpectedChecksum { value: String },

    /// Compute the digest of the selected image
    CalculateChecksum,

    ChecksumCalculated {
        path: PathBuf,
        algorithm: ChecksumAlgorithm,
        digest: String,
    },

    ChecksumFailed {
        path: PathBuf,
        algorithm: ChecksumAlgorithm,
        error: String,
    },

    // ─────────────────────────────────────────────────────────
    // Write Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Verify flag for the next write (not persisted)
    SetVerify { enabled: bool },

    /// Ask for confirmation to write the selected image to the selected device
    RequestWrite,

    /// Confirmation accepted
    ConfirmWrite,

    /// Confirmation declined
    CancelWrite,

    /// A `write-progress` event from the backend
    WriteProgress(WriteProgress),

    WriteCompleted,

    WriteFailed { error: String },

    /// Leave `complete` / `error` and return to idle
    ResetWrite,

    EjectCompleted { device_path: String },

    EjectFailed { device_path: String, error: String },

    // ─────────────────────────────────────────────────────────
    // Preferences
    // ─────────────────────────────────────────────────────────
    SetTheme { theme: Theme },

    SetMode { mode: AppMode },

    /// Default verify flag for new writes (persisted)
    SetVerifyAfterWrite { enabled: bool },

    SetAutoEject { enabled: bool },

    SetShowNotification { enabled: bool },

    /// Persist the current preferences
    SavePreferences,

    PreferencesSaveFailed { error: String },
}
