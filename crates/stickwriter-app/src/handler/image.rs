//! Image selection and validation handlers

use std::path::{Path, PathBuf};

use stickwriter_core::prelude::*;
use stickwriter_core::{FileInfo, ImageValidation};

use crate::message::Message;
use crate::state::{AppState, ValidationKey};

use super::{UpdateAction, UpdateResult};

pub fn handle_select(state: &mut AppState, path: PathBuf) -> UpdateResult {
    if state.is_writing() {
        debug!("Ignoring image selection while {}", state.write.phase);
        return UpdateResult::none();
    }
    state.image_pending = Some(path.clone());
    UpdateResult::action(UpdateAction::LoadFileInfo { path })
}

/// New image: drop every result computed for the previous one
pub fn handle_info_loaded(state: &mut AppState, info: FileInfo) -> UpdateResult {
    if state.is_writing() {
        return UpdateResult::none();
    }
    if !take_image_pending(state, &info.path) {
        debug!("Discarding stale image info for {:?}", info.path);
        return UpdateResult::none();
    }

    debug!("Selected image {:?} ({})", info.path, info.size_human);
    state.selected_image = Some(info);
    state.checksum.calculated = None;
    state.checksum.pending = None;
    state.validation.clear();

    UpdateResult::message(Message::RequestValidation)
}

/// Keeps the previous selection
pub fn handle_info_failed(state: &mut AppState, path: PathBuf, error: String) -> UpdateResult {
    if !take_image_pending(state, &path) {
        debug!("Discarding stale image error for {:?}", path);
        return UpdateResult::none();
    }
    warn!("Failed to read image {:?}: {}", path, error);
    UpdateResult::none()
}

fn take_image_pending(state: &mut AppState, path: &Path) -> bool {
    if state.image_pending.as_deref() == Some(path) {
        state.image_pending = None;
        true
    } else {
        false
    }
}

pub fn handle_clear(state: &mut AppState) -> UpdateResult {
    if state.is_writing() {
        return UpdateResult::none();
    }
    state.selected_image = None;
    state.image_pending = None;
    state.checksum.calculated = None;
    state.checksum.pending = None;
    state.validation.clear();
    UpdateResult::none()
}

pub fn handle_request_validation(state: &mut AppState) -> UpdateResult {
    let Some(key) = state.validation_to_request() else {
        return UpdateResult::none();
    };

    let device_size = state.selected_device.as_ref().map(|d| d.size);
    let path = key.path.clone();
    state.validation.pending = Some(key);

    UpdateResult::action(UpdateAction::ValidateImage { path, device_size })
}

pub fn handle_validation_completed(
    state: &mut AppState,
    path: PathBuf,
    result: ImageValidation,
) -> UpdateResult {
    let Some(key) = take_pending(state, &path) else {
        debug!("Discarding stale validation for {:?}", path);
        return UpdateResult::none();
    };

    if !result.is_valid {
        debug!("Image {:?} failed validation: {:?}", path, result.errors);
    }
    state.validation.result = Some((key, result));
    UpdateResult::none()
}

/// Clears the in-flight marker so a later request can retry
pub fn handle_validation_failed(state: &mut AppState, path: PathBuf, error: String) -> UpdateResult {
    warn!("Image validation failed for {:?}: {}", path, error);
    take_pending(state, &path);
    UpdateResult::none()
}

/// Take the in-flight marker if `path` is what it is waiting for
fn take_pending(state: &mut AppState, path: &Path) -> Option<ValidationKey> {
    let matches = state
        .validation
        .pending
        .as_ref()
        .is_some_and(|key| key.path == path && key.mode == state.preferences.mode);

    if matches {
        state.validation.pending.take()
    } else {
        None
    }
}
