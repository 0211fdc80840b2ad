//! Confirm dialog state.
//!
//! Data model for confirmation dialogs. Front-ends render it and answer with
//! one of the option messages.

use std::path::PathBuf;

use stickwriter_core::{BlockDevice, FileInfo};

use crate::message::Message;

/// Source and destination a write prompt was shown for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    pub iso_path: PathBuf,
    pub device_path: String,
}

#[derive(Debug, Clone)]
pub struct ConfirmDialogState {
    pub title: String,
    pub message: String,
    pub options: Vec<(String, Message)>,
    /// Set for write prompts; confirming writes exactly this pair
    pub target: Option<WriteTarget>,
}

impl ConfirmDialogState {
    /// Create a generic confirmation dialog
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        options: Vec<(&str, Message)>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            options: options
                .into_iter()
                .map(|(label, msg)| (label.to_string(), msg))
                .collect(),
            target: None,
        }
    }

    /// Destructive-write confirmation naming the target device and its size
    pub fn write_confirmation(image: &FileInfo, device: &BlockDevice) -> Self {
        let dialog = Self::new(
            "Erase and write?",
            format!(
                "All data on {} ({}, {}) will be erased and replaced with {}.",
                device.name, device.path, device.size_human, image.name
            ),
            vec![
                ("Write", Message::ConfirmWrite),
                ("Cancel", Message::CancelWrite),
            ],
        );
        Self {
            target: Some(WriteTarget {
                iso_path: image.path.clone(),
                device_path: device.path.clone(),
            }),
            ..dialog
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickwriter_backend::test_utils::{test_device, test_file_info};

    #[test]
    fn test_write_confirmation_names_device_and_size() {
        let image = test_file_info("/images/debian.iso", 1024);
        let device = test_device("/dev/sdb", 16 * 1024 * 1024 * 1024);

        let dialog = ConfirmDialogState::write_confirmation(&image, &device);

        assert!(dialog.message.contains("/dev/sdb"));
        assert!(dialog.message.contains("16.0 GB"));
        assert!(dialog.message.contains("debian.iso"));
        assert_eq!(dialog.options.len(), 2);
        assert!(matches!(dialog.options[0].1, Message::ConfirmWrite));
        assert!(matches!(dialog.options[1].1, Message::CancelWrite));
        assert_eq!(
            dialog.target,
            Some(WriteTarget {
                iso_path: PathBuf::from("/images/debian.iso"),
                device_path: "/dev/sdb".to_string(),
            })
        );
    }
}
