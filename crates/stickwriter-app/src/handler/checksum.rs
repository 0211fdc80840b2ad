//! Checksum handlers

use std::path::PathBuf;

use stickwriter_core::prelude::*;
use stickwriter_core::ChecksumAlgorithm;

use crate::state::{AppState, ChecksumRequest};

use super::{UpdateAction, UpdateResult};

/// Switching algorithm invalidates the digest and any in-flight request
pub fn handle_set_algorithm(state: &mut AppState, algorithm: ChecksumAlgorithm) -> UpdateResult {
    if state.checksum.algorithm != algorithm {
        state.checksum.algorithm = algorithm;
        state.checksum.calculated = None;
        state.checksum.pending = None;
    }
    UpdateResult::none()
}

pub fn handle_set_expected(state: &mut AppState, value: String) -> UpdateResult {
    state.checksum.expected = value;
    UpdateResult::none()
}

pub fn handle_calculate(state: &mut AppState) -> UpdateResult {
    let Some(path) = state.selected_image_path().map(|p| p.to_path_buf()) else {
        debug!("No image selected, nothing to checksum");
        return UpdateResult::none();
    };

    let algorithm = state.checksum.algorithm;
    state.checksum.calculated = None;
    state.checksum.pending = Some(ChecksumRequest {
        path: path.clone(),
        algorithm,
    });

    UpdateResult::action(UpdateAction::CalculateChecksum { path, algorithm })
}

pub fn handle_calculated(
    state: &mut AppState,
    path: PathBuf,
    algorithm: ChecksumAlgorithm,
    digest: String,
) -> UpdateResult {
    if !take_pending(state, path, algorithm) {
        debug!("Discarding stale {} digest", algorithm);
        return UpdateResult::none();
    }

    state.checksum.calculated = Some(digest);
    UpdateResult::none()
}

pub fn handle_failed(
    state: &mut AppState,
    path: PathBuf,
    algorithm: ChecksumAlgorithm,
    error: String,
) -> UpdateResult {
    warn!("{} checksum of {:?} failed: {}", algorithm, path, error);
    take_pending(state, path, algorithm);
    UpdateResult::none()
}

/// Accept a result only for the outstanding request on the current image
fn take_pending(state: &mut AppState, path: PathBuf, algorithm: ChecksumAlgorithm) -> bool {
    let request = ChecksumRequest { path, algorithm };
    let current = state.checksum.pending.as_ref() == Some(&request)
        && state.selected_image_path() == Some(request.path.as_path())
        && state.checksum.algorithm == algorithm;

    if current {
        state.checksum.pending = None;
    }
    current
}
