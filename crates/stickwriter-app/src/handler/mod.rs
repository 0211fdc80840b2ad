//! Handler module - TEA update function and message handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `devices`: Device enumeration and selection
//! - `image`: Image selection and validation
//! - `checksum`: Digest calculation and comparison
//! - `write`: Write lifecycle
//! - `settings`: Preference changes

pub(crate) mod checksum;
pub(crate) mod devices;
pub(crate) mod image;
pub(crate) mod settings;
pub(crate) mod update;
pub(crate) mod write;


use std::path::PathBuf;

use stickwriter_core::{ChecksumAlgorithm, Theme};

use crate::config::Preferences;
use crate::message::Message;

// Re-export main entry point
pub use update::update;

/// Actions that the engine should perform after update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Enumerate removable devices
    ListDevices,

    /// Read metadata for a picked image
    LoadFileInfo { path: PathBuf },

    /// Inspect the image, optionally against the target device size
    ValidateImage {
        path: PathBuf,
        device_size: Option<u64>,
    },

    /// Compute the image digest
    CalculateChecksum {
        path: PathBuf,
        algorithm: ChecksumAlgorithm,
    },

    /// Run the backend write; progress comes back as messages
    StartWrite {
        iso_path: PathBuf,
        device_path: String,
        verify: bool,
    },

    /// Power off the device after a successful write
    EjectDevice { device_path: String },

    /// Persist preferences
    SavePreferences { preferences: Preferences },

    /// Tell the front-end to switch theme
    ApplyTheme { theme: Theme },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the engine to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }

    /// An action followed by another message
    pub fn action_then(action: UpdateAction, msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: Some(action),
        }
    }
}
