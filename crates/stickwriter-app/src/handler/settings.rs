//! Preference handlers
//!
//! Every change is persisted. Theme changes are also applied.

use stickwriter_core::prelude::*;
use stickwriter_core::{AppMode, Theme};

use crate::message::Message;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

pub fn handle_set_theme(state: &mut AppState, theme: Theme) -> UpdateResult {
    if state.preferences.theme == theme {
        return UpdateResult::none();
    }
    state.preferences.theme = theme;
    UpdateResult::action_then(UpdateAction::ApplyTheme { theme }, Message::SavePreferences)
}

pub fn handle_set_mode(state: &mut AppState, mode: AppMode) -> UpdateResult {
    if state.preferences.mode == mode {
        return UpdateResult::none();
    }
    debug!("Mode {} -> {}", state.preferences.mode, mode);
    state.preferences.mode = mode;

    // Results for the old mode arriving later are stale
    state.validation.pending = None;

    let result = save(state);
    if mode.is_advanced() {
        UpdateResult {
            message: Some(Message::RequestValidation),
            ..result
        }
    } else {
        result
    }
}

/// Changes the persisted default and the flag for the next write
pub fn handle_set_verify_after_write(state: &mut AppState, enabled: bool) -> UpdateResult {
    state.verify = enabled;
    if state.preferences.verify_after_write == enabled {
        return UpdateResult::none();
    }
    state.preferences.verify_after_write = enabled;
    save(state)
}

pub fn handle_set_auto_eject(state: &mut AppState, enabled: bool) -> UpdateResult {
    if state.preferences.auto_eject == enabled {
        return UpdateResult::none();
    }
    state.preferences.auto_eject = enabled;
    save(state)
}

pub fn handle_set_show_notification(state: &mut AppState, enabled: bool) -> UpdateResult {
    if state.preferences.show_notification == enabled {
        return UpdateResult::none();
    }
    state.preferences.show_notification = enabled;
    save(state)
}

pub fn handle_save(state: &mut AppState) -> UpdateResult {
    save(state)
}

pub fn handle_save_failed(error: String) -> UpdateResult {
    warn!("Failed to save preferences: {}", error);
    UpdateResult::none()
}

fn save(state: &AppState) -> UpdateResult {
    UpdateResult::action(UpdateAction::SavePreferences {
        preferences: state.preferences.clone(),
    })
}
