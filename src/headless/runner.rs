//! Headless command runners
//!
//! One function per `stickw` subcommand. `run_write` drives the [`Engine`]
//! through the whole lifecycle; the others are single backend calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stickwriter_app::config::{self, Preferences};
use stickwriter_app::state::{AppState, ChecksumState};
use stickwriter_app::{ChecksumVerdict, Engine, EngineEvent, Message};
use stickwriter_backend::Backend;
use stickwriter_core::prelude::*;
use stickwriter_core::{AppMode, ChecksumAlgorithm, Theme, WritePhase};
use tokio::sync::{broadcast, mpsc};

use super::HeadlessEvent;

// ─────────────────────────────────────────────────────────────────────────────
// One-shot commands
// ─────────────────────────────────────────────────────────────────────────────

/// Enumerate once and print the result
pub async fn run_devices<B: Backend + Sync>(backend: &B) -> Result<()> {
    let devices = backend.list_devices().await?;
    info!("Found {} removable device(s)", devices.len());
    HeadlessEvent::devices(devices).emit();
    Ok(())
}

/// Digest an image and compare it with `expected` if given
pub async fn run_checksum<B: Backend + Sync>(
    backend: &B,
    image: &Path,
    algorithm: ChecksumAlgorithm,
    expected: Option<String>,
) -> Result<()> {
    let digest = backend.calculate_checksum(image, algorithm).await?;

    let checksum = ChecksumState {
        calculated: Some(digest.clone()),
        algorithm,
        expected: expected.unwrap_or_default(),
        pending: None,
    };
    let verdict = checksum.verdict();

    HeadlessEvent::checksum(
        Some(image),
        algorithm,
        &digest,
        verdict.map(|v| v == ChecksumVerdict::Match),
    )
    .emit();

    if verdict == Some(ChecksumVerdict::Mismatch) {
        return Err(Error::ChecksumMismatch {
            expected: checksum.expected.trim().to_string(),
            actual: digest,
        });
    }
    Ok(())
}

/// Inspect an image, optionally against a device's capacity
pub async fn run_validate<B: Backend + Sync>(
    backend: &B,
    image: &Path,
    device: Option<&str>,
) -> Result<()> {
    let device_size = match device {
        Some(path) => {
            let devices = backend.list_devices().await?;
            let device = devices
                .iter()
                .find(|d| d.path == path)
                .ok_or_else(|| Error::device_not_found(path))?;
            Some(device.size)
        }
        None => None,
    };

    let result = backend.validate_image(image, device_size).await?;
    HeadlessEvent::validation(image, &result).emit();

    if !result.is_valid {
        return Err(Error::InvalidImage {
            errors: result.errors,
        });
    }
    Ok(())
}

/// Requested preference changes; `None` leaves a key alone
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub theme: Option<Theme>,
    pub verify_after_write: Option<bool>,
    pub mode: Option<AppMode>,
    pub auto_eject: Option<bool>,
    pub show_notification: Option<bool>,
}

impl SettingsUpdate {
    /// Apply to `prefs`, returning whether anything changed
    pub fn apply(&self, prefs: &mut Preferences) -> bool {
        let before = prefs.clone();
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(enabled) = self.verify_after_write {
            prefs.verify_after_write = enabled;
        }
        if let Some(mode) = self.mode {
            prefs.mode = mode;
        }
        if let Some(enabled) = self.auto_eject {
            prefs.auto_eject = enabled;
        }
        if let Some(enabled) = self.show_notification {
            prefs.show_notification = enabled;
        }
        *prefs != before
    }
}

/// Show preferences at `path`, saving any requested changes first
pub fn run_settings(path: &Path, update: &SettingsUpdate) -> Result<Preferences> {
    let mut prefs = config::load_preferences_from(path);

    if update.apply(&mut prefs) {
        config::save_preferences_to(path, &prefs)
            .with_context(|| format!("Saving preferences to {}", path.display()))?;
        info!("Saved preferences to {:?}", path);
    }

    HeadlessEvent::preferences(&prefs).emit();
    Ok(prefs)
}

// ─────────────────────────────────────────────────────────────────────────────
// Write
// ─────────────────────────────────────────────────────────────────────────────

/// How the destructive-write prompt is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Accept without asking (`--yes`)
    AssumeYes,
    /// Read `y`/`yes` from stdin; anything else declines
    Stdin,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub image: PathBuf,
    pub device: String,
    pub verify: bool,
    pub confirmation: Confirmation,
    /// Force advanced mode for this run
    pub advanced: bool,
    /// Force auto-eject for this run
    pub auto_eject: bool,
}

/// Write an image to a device through the engine, emitting events as it goes
pub async fn run_write<B>(
    backend: Arc<B>,
    mut preferences: Preferences,
    options: WriteOptions,
) -> Result<()>
where
    B: Backend + Sync + 'static,
{
    info!("═══════════════════════════════════════════════════════");
    info!("Writing {} to {}", options.image.display(), options.device);
    info!("═══════════════════════════════════════════════════════");

    // Command-line overrides apply to this run only
    if options.advanced {
        preferences.mode = AppMode::Advanced;
    }
    if options.auto_eject {
        preferences.auto_eject = true;
    }

    let mut engine = Engine::with_preferences(backend, preferences, None);
    let mut events = engine.subscribe();

    let result = drive_write(&mut engine, &mut events, &options).await;

    engine.shutdown().await;
    forward_events(&mut events);

    result
}

async fn drive_write<B>(
    engine: &mut Engine<B>,
    events: &mut broadcast::Receiver<EngineEvent>,
    options: &WriteOptions,
) -> Result<()>
where
    B: Backend + Sync + 'static,
{
    // Devices
    engine.start_polling();
    pump_until(engine, events, |msg, _| match msg {
        Message::DevicesListed { .. } => Ok(true),
        Message::DeviceListFailed { error } => Err(Error::backend(error.clone())),
        _ => Ok(false),
    })
    .await?;

    dispatch(
        engine,
        events,
        Message::SelectDevice {
            path: options.device.clone(),
        },
    );
    if engine.state.selected_device.is_none() {
        return Err(Error::device_not_found(&options.device));
    }

    dispatch(
        engine,
        events,
        Message::SetVerify {
            enabled: options.verify,
        },
    );

    // Image
    dispatch(
        engine,
        events,
        Message::SelectImage {
            path: options.image.clone(),
        },
    );
    pump_until(engine, events, |msg, _| match msg {
        Message::ImageInfoLoaded { .. } => Ok(true),
        Message::ImageInfoFailed { path, error } => Err(Error::file_read(path, error)),
        _ => Ok(false),
    })
    .await?;

    if engine.state.validation.is_loading() {
        pump_until(engine, events, |msg, _| match msg {
            Message::ValidationCompleted { result, .. } if !result.is_valid => {
                Err(Error::InvalidImage {
                    errors: result.errors.clone(),
                })
            }
            Message::ValidationCompleted { .. } | Message::ValidationFailed { .. } => Ok(true),
            _ => Ok(false),
        })
        .await?;
    }

    // Confirmation
    dispatch(engine, events, Message::RequestWrite);
    if engine.state.confirm_dialog.is_none() {
        return Err(Error::task("Write could not be requested"));
    }

    match options.confirmation {
        Confirmation::AssumeYes => dispatch(engine, events, Message::ConfirmWrite),
        Confirmation::Stdin => {
            let answer_tx = engine.msg_sender();
            std::thread::spawn(move || read_confirmation_blocking(answer_tx));

            pump_until(engine, events, |msg, _| {
                Ok(matches!(msg, Message::ConfirmWrite | Message::CancelWrite))
            })
            .await?;
        }
    }

    if engine.state.write.phase == WritePhase::Idle {
        if engine.state.selected_device.is_none() {
            return Err(Error::device_not_found(&options.device));
        }
        info!("Write declined");
        return Err(Error::WriteDeclined);
    }

    // Write
    pump_until(engine, events, |_, state| Ok(state.write.phase.is_finished())).await?;

    if engine.state.write.phase == WritePhase::Error {
        let message = engine
            .state
            .write
            .error
            .clone()
            .unwrap_or_else(|| "An error occurred.".to_string());
        return Err(Error::WriteFailed { message });
    }

    let prefs = &engine.state.preferences;
    if prefs.mode.is_advanced() && prefs.auto_eject {
        pump_until(engine, events, |msg, _| match msg {
            Message::EjectCompleted { device_path } => {
                HeadlessEvent::ejected(device_path).emit();
                Ok(true)
            }
            Message::EjectFailed { error, .. } => {
                HeadlessEvent::error(format!("Failed to eject: {}", error), false).emit();
                Ok(true)
            }
            _ => Ok(false),
        })
        .await?;
    }

    Ok(())
}

/// Process a message directly and forward the resulting events
fn dispatch<B>(engine: &mut Engine<B>, events: &mut broadcast::Receiver<EngineEvent>, msg: Message)
where
    B: Backend + Sync + 'static,
{
    engine.process_message(msg);
    forward_events(events);
}

/// Process queued messages until `done` accepts one.
///
/// `done` sees each message after it was processed together with the new
/// state. A quit request ends the wait with [`Error::Interrupted`].
async fn pump_until<B, F>(
    engine: &mut Engine<B>,
    events: &mut broadcast::Receiver<EngineEvent>,
    mut done: F,
) -> Result<()>
where
    B: Backend + Sync + 'static,
    F: FnMut(&Message, &AppState) -> Result<bool>,
{
    loop {
        let msg = engine.msg_rx.recv().await.ok_or(Error::ChannelClosed)?;
        let seen = msg.clone();

        engine.process_message(msg);
        forward_events(events);

        if engine.should_quit() {
            return Err(Error::Interrupted);
        }
        if done(&seen, &engine.state)? {
            return Ok(());
        }
    }
}

/// Emit every pending engine event as NDJSON
fn forward_events(events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => {
                if let Some(headless) = HeadlessEvent::from_engine_event(&event) {
                    headless.emit();
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Dropped {} engine events", n);
            }
            Err(_) => break,
        }
    }
}

/// Read one answer line from stdin (blocking)
fn read_confirmation_blocking(msg_tx: mpsc::Sender<Message>) {
    use std::io::BufRead;

    let mut line = String::new();
    let msg = match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) if is_yes(&line) => Message::ConfirmWrite,
        Ok(_) => Message::CancelWrite,
        Err(e) => {
            error!("Failed to read stdin: {}", e);
            Message::CancelWrite
        }
    };
    let _ = msg_tx.blocking_send(msg);
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
