//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Image Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}: {reason}")]
    FileRead { path: PathBuf, reason: String },

    #[error("Selected image is not a file: {path}")]
    NotAFile { path: PathBuf },

    #[error("Selected image is empty")]
    EmptyImage,

    #[error("Image size ({image}) exceeds device capacity ({device})")]
    ImageTooLarge { image: String, device: String },

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // ─────────────────────────────────────────────────────────────
    // Device Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Device not found or not removable: {path}")]
    DeviceNotFound { path: String },

    #[error("Permission denied: {message}")]
    Permission { message: String },

    #[error("Command failed: {message}")]
    Command { message: String },

    #[error("Device operations are not supported on this platform")]
    UnsupportedPlatform,

    #[error("Verification failed: data mismatch detected at byte {offset}")]
    VerificationMismatch { offset: u64 },

    // ─────────────────────────────────────────────────────────────
    // Backend Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Background task failed: {message}")]
    Task { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    #[error("Write was declined by the user")]
    WriteDeclined,

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Image failed validation: {}", errors.join("; "))]
    InvalidImage { errors: Vec<String> },

    #[error("Interrupted")]
    Interrupted,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn file_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::FileRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn device_not_found(path: impl Into<String>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors leave the application usable: the user can retry
    /// the same operation with a fresh explicit action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. }
                | Error::NotAFile { .. }
                | Error::EmptyImage
                | Error::ImageTooLarge { .. }
                | Error::DeviceNotFound { .. }
                | Error::Backend { .. }
                | Error::Command { .. }
                | Error::VerificationMismatch { .. }
                | Error::WriteDeclined
                | Error::WriteFailed { .. }
                | Error::ChecksumMismatch { .. }
                | Error::InvalidImage { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedPlatform | Error::ChannelClosed | Error::Config { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::device_not_found("/dev/sdb");
        assert_eq!(
            err.to_string(),
            "Device not found or not removable: /dev/sdb"
        );

        let err = Error::ImageTooLarge {
            image: "8.0 GB".to_string(),
            device: "4.0 GB".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Image size (8.0 GB) exceeds device capacity (4.0 GB)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::UnsupportedPlatform.is_fatal());
        assert!(Error::ChannelClosed.is_fatal());
        assert!(!Error::backend("test").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::backend("test").is_recoverable());
        assert!(Error::VerificationMismatch { offset: 512 }.is_recoverable());
        assert!(Error::WriteDeclined.is_recoverable());
        assert!(!Error::UnsupportedPlatform.is_recoverable());
    }

    #[test]
    fn test_file_read_includes_path_and_reason() {
        let err = Error::file_read("/tmp/missing.iso", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.iso"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_verification_mismatch_reports_offset() {
        let err = Error::VerificationMismatch { offset: 4096 };
        assert!(err.to_string().contains("4096"));
        assert!(err.to_string().starts_with("Verification failed"));
    }

    #[test]
    fn test_invalid_image_joins_errors() {
        let err = Error::InvalidImage {
            errors: vec!["Selected image is empty".to_string(), "too big".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Image failed validation: Selected image is empty; too big"
        );
    }

    #[test]
    fn test_context_preserves_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("opening device").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
