//! The backend contract
//!
//! Everything destructive or slow goes through this trait: device
//! enumeration, file metadata, checksums, format inspection and the
//! byte-level write. The app crate only ever talks to a [`Backend`].

use std::path::Path;

use stickwriter_core::prelude::*;
use stickwriter_core::{BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, WriteProgress};
use tokio::sync::mpsc;

/// Privileged disk operations
///
/// `Backend` is the `Send` variant generated by `trait_variant`; implement it
/// directly so the returned futures can be spawned onto the runtime.
#[trait_variant::make(Backend: Send)]
pub trait LocalBackend {
    /// Enumerate removable block devices
    async fn list_devices(&self) -> Result<Vec<BlockDevice>>;

    /// Read metadata for a source image
    async fn get_file_info(&self, path: &Path) -> Result<FileInfo>;

    /// Inspect an image's format, optionally checking it fits on a device of `device_size` bytes
    async fn validate_image(&self, path: &Path, device_size: Option<u64>)
        -> Result<ImageValidation>;

    /// Compute a lowercase hex digest of the file at `path`
    async fn calculate_checksum(&self, path: &Path, algorithm: ChecksumAlgorithm)
        -> Result<String>;

    /// Write `iso_path` onto `device_path`, optionally reading it back.
    ///
    /// Progress events are sent on `progress` while the call is running. The
    /// sender is dropped when the call returns, which closes the channel.
    async fn write_image(
        &self,
        iso_path: &Path,
        device_path: &str,
        verify: bool,
        progress: mpsc::Sender<WriteProgress>,
    ) -> Result<()>;

    /// Power off / eject a device so it can be removed
    async fn eject_device(&self, device_path: &str) -> Result<()>;
}
