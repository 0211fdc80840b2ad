//! Fallback for targets without a device implementation

use stickwriter_core::prelude::*;
use stickwriter_core::BlockDevice;

use crate::tools::ToolAvailability;

pub fn list_removable_devices() -> Result<Vec<BlockDevice>> {
    Err(Error::UnsupportedPlatform)
}

pub async fn unmount_device(_device: &BlockDevice, _tools: &ToolAvailability) -> Result<()> {
    Err(Error::UnsupportedPlatform)
}

pub async fn eject_device(_device_path: &str, _tools: &ToolAvailability) -> Result<()> {
    Err(Error::UnsupportedPlatform)
}
