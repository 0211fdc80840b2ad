//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::AppState;

use super::{checksum, devices, image, settings, write, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Device Discovery
        // ─────────────────────────────────────────────────────────
        Message::RefreshDevices => devices::handle_refresh(state),
        Message::DevicesListed { devices } => devices::handle_listed(state, devices),
        Message::DeviceListFailed { error } => devices::handle_list_failed(state, error),
        Message::SelectDevice { path } => devices::handle_select(state, path),
        Message::ClearDevice => devices::handle_clear(state),

        // ─────────────────────────────────────────────────────────
        // Image Selection & Validation
        // ─────────────────────────────────────────────────────────
        Message::SelectImage { path } => image::handle_select(state, path),
        Message::ImageInfoLoaded { info } => image::handle_info_loaded(state, info),
        Message::ImageInfoFailed { path, error } => image::handle_info_failed(state, path, error),
        Message::ClearImage => image::handle_clear(state),
        Message::RequestValidation => image::handle_request_validation(state),
        Message::ValidationCompleted { path, result } => {
            image::handle_validation_completed(state, path, result)
        }
        Message::ValidationFailed { path, error } => {
            image::handle_validation_failed(state, path, error)
        }

        // ─────────────────────────────────────────────────────────
        // Checksum
        // ─────────────────────────────────────────────────────────
        Message::SetChecksumAlgorithm { algorithm } => {
            checksum::handle_set_algorithm(state, algorithm)
        }
        Message::SetExpectedChecksum { value } => checksum::handle_set_expected(state, value),
        Message::CalculateChecksum => checksum::handle_calculate(state),
        Message::ChecksumCalculated {
            path,
            algorithm,
            digest,
        } => checksum::handle_calculated(state, path, algorithm, digest),
        Message::ChecksumFailed {
            path,
            algorithm,
            error,
        } => checksum::handle_failed(state, path, algorithm, error),

        // ─────────────────────────────────────────────────────────
        // Write Lifecycle
        // ─────────────────────────────────────────────────────────
        Message::SetVerify { enabled } => {
            state.verify = enabled;
            UpdateResult::none()
        }
        Message::RequestWrite => write::handle_request(state),
        Message::ConfirmWrite => write::handle_confirm(state),
        Message::CancelWrite => write::handle_cancel(state),
        Message::WriteProgress(progress) => write::handle_progress(state, progress),
        Message::WriteCompleted => write::handle_completed(state),
        Message::WriteFailed { error } => write::handle_failed(state, error),
        Message::ResetWrite => write::handle_reset(state),
        Message::EjectCompleted { device_path } => write::handle_eject_completed(device_path),
        Message::EjectFailed { device_path, error } => {
            write::handle_eject_failed(device_path, error)
        }

        // ─────────────────────────────────────────────────────────
        // Preferences
        // ─────────────────────────────────────────────────────────
        Message::SetTheme { theme } => settings::handle_set_theme(state, theme),
        Message::SetMode { mode } => settings::handle_set_mode(state, mode),
        Message::SetVerifyAfterWrite { enabled } => {
            settings::handle_set_verify_after_write(state, enabled)
        }
        Message::SetAutoEject { enabled } => settings::handle_set_auto_eject(state, enabled),
        Message::SetShowNotification { enabled } => {
            settings::handle_set_show_notification(state, enabled)
        }
        Message::SavePreferences => settings::handle_save(state),
        Message::PreferencesSaveFailed { error } => settings::handle_save_failed(error),
    }
}
