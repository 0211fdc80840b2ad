//! Device enumeration and selection handlers

use stickwriter_core::prelude::*;
use stickwriter_core::BlockDevice;

use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Enumerate unless a write is running or an enumeration is already in flight
pub fn handle_refresh(state: &mut AppState) -> UpdateResult {
    if state.is_writing() {
        debug!("Skipping device refresh while {}", state.write.phase);
        return UpdateResult::none();
    }
    if state.devices.loading {
        return UpdateResult::none();
    }

    state.devices.loading = true;
    UpdateResult::action(UpdateAction::ListDevices)
}

pub fn handle_listed(state: &mut AppState, devices: Vec<BlockDevice>) -> UpdateResult {
    if state.is_writing() {
        // Enumeration started before the write; the set may include the
        // device mid-write with stale mount points.
        debug!("Discarding device list received while writing");
        state.devices.loading = false;
        return UpdateResult::none();
    }

    debug!("Discovered {} removable device(s)", devices.len());
    state.devices.replace(devices);

    let unplugged = state
        .selected_device
        .as_ref()
        .is_some_and(|d| !state.devices.contains(&d.path));
    if unplugged {
        if let Some(device) = state.selected_device.take() {
            info!("Selected device {} is gone, clearing selection", device.path);
        }
    }

    UpdateResult::none()
}

/// Failure leaves an empty set but keeps the selection
pub fn handle_list_failed(state: &mut AppState, error: String) -> UpdateResult {
    if state.is_writing() {
        debug!("Discarding device list failure received while writing: {}", error);
        state.devices.loading = false;
        return UpdateResult::none();
    }

    warn!("Device enumeration failed: {}", error);
    state.devices.replace(Vec::new());
    UpdateResult::none()
}

pub fn handle_select(state: &mut AppState, path: String) -> UpdateResult {
    if state.is_writing() {
        return UpdateResult::none();
    }

    let Some(device) = state.devices.find(&path).cloned() else {
        warn!("Cannot select {}: not in the latest device list", path);
        return UpdateResult::none();
    };

    state.selected_device = Some(device);
    UpdateResult::none()
}

pub fn handle_clear(state: &mut AppState) -> UpdateResult {
    if state.is_writing() {
        return UpdateResult::none();
    }
    state.selected_device = None;
    UpdateResult::none()
}
