//! Platform-specific device discovery and control
//!
//! Each submodule exposes the same API so the rest of the crate can call it
//! without caring which OS it runs on:
//!
//! - `list_removable_devices()` - enumerate writable removable disks
//! - `unmount_device()` - release every mount point of a device
//! - `eject_device()` - power the device off so it can be unplugged

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::*;

#[cfg(not(target_os = "linux"))]
mod unsupported;
#[cfg(not(target_os = "linux"))]
pub use self::unsupported::*;
