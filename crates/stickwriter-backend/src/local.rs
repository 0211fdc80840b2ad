//! Backend that talks to the local machine's disks

use std::path::Path;

use stickwriter_core::prelude::*;
use stickwriter_core::{
    format_size, BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, WriteProgress,
};
use tokio::sync::mpsc;

use crate::backend::Backend;
use crate::tools::ToolAvailability;
use crate::{checksum, image, platform, writer};

/// [`Backend`] over the local sysfs, block devices and util-linux tools.
///
/// Device writes need read/write access to the target block device, which
/// normally means running as root.
#[derive(Debug, Clone, Default)]
pub struct LocalDiskBackend {
    tools: ToolAvailability,
}

impl LocalDiskBackend {
    pub fn new() -> Self {
        Self {
            tools: ToolAvailability::detect(),
        }
    }

    /// Re-enumerate and look `device_path` up. Refuses anything that is not
    /// currently a removable, non-system disk.
    async fn require_removable_device(&self, device_path: &str) -> Result<BlockDevice> {
        let devices = self.list_devices().await?;
        devices
            .into_iter()
            .find(|device| device.path == device_path)
            .ok_or_else(|| Error::device_not_found(device_path))
    }
}

impl Backend for LocalDiskBackend {
    async fn list_devices(&self) -> Result<Vec<BlockDevice>> {
        let devices = tokio::task::spawn_blocking(platform::list_removable_devices)
            .await
            .map_err(|e| Error::task(e.to_string()))??;
        debug!("Found {} removable device(s)", devices.len());
        Ok(devices)
    }

    async fn get_file_info(&self, path: &Path) -> Result<FileInfo> {
        image::file_info(path).await
    }

    async fn validate_image(
        &self,
        path: &Path,
        device_size: Option<u64>,
    ) -> Result<ImageValidation> {
        image::validate_image(path, device_size).await
    }

    async fn calculate_checksum(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        checksum::calculate_checksum(path, algorithm).await
    }

    async fn write_image(
        &self,
        iso_path: &Path,
        device_path: &str,
        verify: bool,
        progress: mpsc::Sender<WriteProgress>,
    ) -> Result<()> {
        let device = self.require_removable_device(device_path).await?;

        platform::unmount_device(&device, &self.tools)
            .await
            .map_err(|e| Error::command(format!("Failed to unmount device: {}", e)))?;

        let total_bytes = image::image_size(iso_path).await?;
        if device.size > 0 && total_bytes > device.size {
            return Err(Error::ImageTooLarge {
                image: format_size(total_bytes),
                device: format_size(device.size),
            });
        }

        writer::write_image(iso_path, Path::new(&device.path), total_bytes, verify, &progress).await
    }

    async fn eject_device(&self, device_path: &str) -> Result<()> {
        let device = self.require_removable_device(device_path).await?;
        platform::eject_device(&device.path, &self.tools).await
    }
}
