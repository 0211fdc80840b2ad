//! External tool availability
//!
//! Unmounting and ejecting shell out to util-linux / udisks. The tools are
//! located once when the backend is created.

use std::path::PathBuf;

/// Cached locations of the external tools used for device control
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    /// `umount` from util-linux
    pub umount: Option<PathBuf>,

    /// `pkexec`, used to retry a failed unmount with elevated privileges
    pub pkexec: Option<PathBuf>,

    /// `udisksctl`, preferred for powering a device off
    pub udisksctl: Option<PathBuf>,

    /// `eject`, fallback when udisks is not installed
    pub eject: Option<PathBuf>,
}

impl ToolAvailability {
    /// Locate tools on `PATH` (run once at startup)
    pub fn detect() -> Self {
        let tools = Self {
            umount: locate("umount"),
            pkexec: locate("pkexec"),
            udisksctl: locate("udisksctl"),
            eject: locate("eject"),
        };
        tracing::debug!("Tool availability: {:?}", tools);
        tools
    }

    /// Whether any way of ejecting a device is available
    pub fn can_eject(&self) -> bool {
        self.udisksctl.is_some() || self.eject.is_some()
    }

    /// User-facing hint when no eject tool was found
    pub fn eject_unavailable_message(&self) -> Option<&'static str> {
        if self.can_eject() {
            None
        } else {
            Some("Neither udisksctl nor eject was found. Install udisks2 or util-linux.")
        }
    }
}

fn locate(tool: &str) -> Option<PathBuf> {
    which::which(tool)
        .inspect_err(|e| tracing::debug!("{} not found: {}", tool, e))
        .ok()
}
