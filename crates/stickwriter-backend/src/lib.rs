//! # stickwriter-backend - Disk Access
//!
//! The privileged side of stickwriter: removable device enumeration, image
//! metadata and format inspection, streaming checksums, and the byte-level
//! write with read-back verification.
//!
//! Depends on [`stickwriter_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Backend Contract
//! - [`Backend`] - Async trait the app crate drives (`Send` futures)
//! - [`LocalDiskBackend`] - Implementation over sysfs and local block devices
//!
//! ### Building Blocks
//! - [`calculate_checksum()`], [`digest_reader()`] - SHA-256 / MD5 digests
//! - [`detect_format()`], [`assess_image()`] - Header-based image validation
//! - [`write_image()`] - Stream an image onto a target and verify it
//! - [`ToolAvailability`] - Located `umount` / `pkexec` / `udisksctl` / `eject`
//!
//! ### Testing
//! With the `test-helpers` feature, [`test_utils`] provides `FakeBackend`, a
//! scriptable in-memory backend, and builders for devices and progress events.

pub mod backend;
pub mod checksum;
pub mod image;
pub mod local;
pub mod platform;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tools;
pub mod writer;

pub use backend::{Backend, LocalBackend};
pub use checksum::{calculate_checksum, digest_reader};
pub use image::{assess_image, detect_format, ImageFormat};
pub use local::LocalDiskBackend;
pub use tools::ToolAvailability;
pub use writer::write_image;
