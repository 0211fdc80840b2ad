//! # stickwriter-core - Core Domain Types
//!
//! Foundation crate for stickwriter. Provides domain types, error handling,
//! display formatting and logging setup.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`BlockDevice`] - A removable block device reported by the backend
//! - [`FileInfo`] - Metadata of the selected source image
//! - [`ImageValidation`] - Result of an image format check
//! - [`WriteProgress`], [`ProgressPhase`] - `write-progress` events
//! - [`WritePhase`] - Write lifecycle phase (idle, preparing, writing, ...)
//! - [`ChecksumAlgorithm`], [`Theme`], [`AppMode`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Formatting (`format`)
//! - [`format_size()`], [`format_speed()`], [`format_eta()`]
//!
//! ## Prelude
//!
//! ```rust
//! use stickwriter_core::prelude::*;
//! ```

pub mod error;
pub mod format;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use format::{format_eta, format_size, format_speed};
pub use types::{
    AppMode, BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, ProgressPhase, Theme,
    WritePhase, WriteProgress,
};
