//! Write lifecycle handlers
//!
//! `idle → preparing → writing → verifying → complete`, with `error`
//! reachable from any running phase. Only `ResetWrite` leaves `complete` or
//! `error`.

use stickwriter_core::prelude::*;
use stickwriter_core::{ProgressPhase, WritePhase, WriteProgress};

use crate::confirm_dialog::ConfirmDialogState;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Ask for confirmation before touching the device
pub fn handle_request(state: &mut AppState) -> UpdateResult {
    if !state.can_write() {
        debug!("Write requested but preconditions not met");
        return UpdateResult::none();
    }
    if state.confirm_dialog.is_some() {
        return UpdateResult::none();
    }

    if let (Some(image), Some(device)) = (&state.selected_image, &state.selected_device) {
        state.confirm_dialog = Some(ConfirmDialogState::write_confirmation(image, device));
    }
    UpdateResult::none()
}

/// Write exactly what the prompt named.
///
/// If the image or device selection changed while the prompt was open, the
/// confirmation is for a different target and nothing is written.
pub fn handle_confirm(state: &mut AppState) -> UpdateResult {
    let Some(target) = state.confirm_dialog.take().and_then(|d| d.target) else {
        return UpdateResult::none();
    };

    if !state.can_write() {
        return UpdateResult::none();
    }

    let image_unchanged = state.selected_image_path() == Some(target.iso_path.as_path());
    let device_unchanged = state
        .selected_device
        .as_ref()
        .is_some_and(|d| d.path == target.device_path);
    if !(image_unchanged && device_unchanged) {
        warn!(
            "Selection changed since confirming {:?} -> {}; not writing",
            target.iso_path, target.device_path
        );
        return UpdateResult::none();
    }

    info!("Writing {:?} to {}", target.iso_path, target.device_path);
    state.write.phase = WritePhase::Preparing;
    state.write.progress = None;
    state.write.error = None;
    state.write.target_device = Some(target.device_path.clone());

    UpdateResult::action(UpdateAction::StartWrite {
        iso_path: target.iso_path,
        device_path: target.device_path,
        verify: state.verify,
    })
}

/// Declining is not an error
pub fn handle_cancel(state: &mut AppState) -> UpdateResult {
    if state.confirm_dialog.take().is_some() {
        debug!("Write cancelled by user");
    }
    UpdateResult::none()
}

pub fn handle_progress(state: &mut AppState, progress: WriteProgress) -> UpdateResult {
    if !state.is_writing() {
        trace!("Ignoring progress outside a write");
        return UpdateResult::none();
    }

    // Never regress from verifying back to writing
    if state.write.phase == WritePhase::Verifying && progress.phase == ProgressPhase::Writing {
        debug!("Ignoring writing progress received while verifying");
        return UpdateResult::none();
    }

    let phase = WritePhase::from(progress.phase);
    if state.write.phase != phase {
        debug!("Write phase {} -> {}", state.write.phase, phase);
        state.write.phase = phase;
    }
    state.write.progress = Some(progress);
    UpdateResult::none()
}

pub fn handle_completed(state: &mut AppState) -> UpdateResult {
    if !state.is_writing() {
        return UpdateResult::none();
    }

    info!("Write complete");
    state.write.phase = WritePhase::Complete;

    let eject = state.preferences.mode.is_advanced() && state.preferences.auto_eject;
    match (&state.write.target_device, eject) {
        (Some(device_path), true) => UpdateResult::action(UpdateAction::EjectDevice {
            device_path: device_path.clone(),
        }),
        _ => UpdateResult::none(),
    }
}

pub fn handle_failed(state: &mut AppState, error: String) -> UpdateResult {
    if !state.is_writing() {
        return UpdateResult::none();
    }

    error!("Write failed: {}", error);
    state.write.phase = WritePhase::Error;
    state.write.error = Some(error);
    UpdateResult::none()
}

pub fn handle_reset(state: &mut AppState) -> UpdateResult {
    if !state.write.phase.is_finished() {
        return UpdateResult::none();
    }
    state.write.reset();
    UpdateResult::none()
}

pub fn handle_eject_completed(device_path: String) -> UpdateResult {
    info!("Ejected {}", device_path);
    UpdateResult::none()
}

/// Non-fatal: the write itself already succeeded
pub fn handle_eject_failed(device_path: String, error: String) -> UpdateResult {
    warn!("Failed to eject {}: {}", device_path, error);
    UpdateResult::none()
}
