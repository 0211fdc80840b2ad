//! Action handlers: UpdateAction dispatch and background task spawning
//!
//! Every backend call runs in its own task and reports back with a message.

use std::path::PathBuf;
use std::sync::Arc;

use stickwriter_backend::Backend;
use stickwriter_core::prelude::*;
use stickwriter_core::WriteProgress;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{save_preferences_to, Preferences};
use crate::engine_event::EngineEvent;
use crate::handler::UpdateAction;
use crate::message::Message;

/// Handle of the running write, if any
pub type WriteTaskSlot = Arc<std::sync::Mutex<Option<JoinHandle<()>>>>;

/// Progress buffered between the backend and the engine
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Everything an action needs besides the action itself
pub struct ActionContext<B> {
    pub backend: Arc<B>,
    pub msg_tx: mpsc::Sender<Message>,
    pub event_tx: broadcast::Sender<EngineEvent>,
    pub write_task: WriteTaskSlot,
    /// Feeds the preference saver; `None` keeps preferences in memory only
    pub preferences_tx: Option<watch::Sender<Preferences>>,
}

/// Execute an action by spawning a background task
pub fn handle_action<B>(action: UpdateAction, ctx: &ActionContext<B>)
where
    B: Backend + Sync + 'static,
{
    match action {
        UpdateAction::ListDevices => {
            let backend = ctx.backend.clone();
            let msg_tx = ctx.msg_tx.clone();
            tokio::spawn(async move {
                let msg = match backend.list_devices().await {
                    Ok(devices) => Message::DevicesListed { devices },
                    Err(e) => Message::DeviceListFailed {
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::LoadFileInfo { path } => {
            let backend = ctx.backend.clone();
            let msg_tx = ctx.msg_tx.clone();
            tokio::spawn(async move {
                let msg = match backend.get_file_info(&path).await {
                    Ok(info) => Message::ImageInfoLoaded { info },
                    Err(e) => Message::ImageInfoFailed {
                        path,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::ValidateImage { path, device_size } => {
            let backend = ctx.backend.clone();
            let msg_tx = ctx.msg_tx.clone();
            tokio::spawn(async move {
                let msg = match backend.validate_image(&path, device_size).await {
                    Ok(result) => Message::ValidationCompleted { path, result },
                    Err(e) => Message::ValidationFailed {
                        path,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::CalculateChecksum { path, algorithm } => {
            let backend = ctx.backend.clone();
            let msg_tx = ctx.msg_tx.clone();
            tokio::spawn(async move {
                let msg = match backend.calculate_checksum(&path, algorithm).await {
                    Ok(digest) => Message::ChecksumCalculated {
                        path,
                        algorithm,
                        digest,
                    },
                    Err(e) => Message::ChecksumFailed {
                        path,
                        algorithm,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::StartWrite {
            iso_path,
            device_path,
            verify,
        } => {
            spawn_write(ctx, iso_path, device_path, verify);
        }

        UpdateAction::EjectDevice { device_path } => {
            let backend = ctx.backend.clone();
            let msg_tx = ctx.msg_tx.clone();
            tokio::spawn(async move {
                let msg = match backend.eject_device(&device_path).await {
                    Ok(()) => Message::EjectCompleted { device_path },
                    Err(e) => Message::EjectFailed {
                        device_path,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::SavePreferences { preferences } => match &ctx.preferences_tx {
            Some(tx) => {
                let _ = tx.send(preferences);
            }
            None => debug!("No preferences path, keeping preferences in memory"),
        },

        UpdateAction::ApplyTheme { theme } => {
            // No subscribers is fine
            let _ = ctx.event_tx.send(EngineEvent::ThemeApplied { theme });
        }
    }
}

/// Run the backend write, forwarding progress as messages.
///
/// Progress is forwarded on the same task that awaits the write, so every
/// `WriteProgress` message is queued before the terminal message.
fn spawn_write<B>(ctx: &ActionContext<B>, iso_path: PathBuf, device_path: String, verify: bool)
where
    B: Backend + Sync + 'static,
{
    let backend = ctx.backend.clone();
    let msg_tx = ctx.msg_tx.clone();

    let handle = tokio::spawn(async move {
        let (progress_tx, mut progress_rx) =
            mpsc::channel::<WriteProgress>(PROGRESS_CHANNEL_CAPACITY);

        let forward_tx = msg_tx.clone();
        let forward = async move {
            while let Some(progress) = progress_rx.recv().await {
                if forward_tx.send(Message::WriteProgress(progress)).await.is_err() {
                    break;
                }
            }
        };

        let (result, ()) = tokio::join!(
            backend.write_image(&iso_path, &device_path, verify, progress_tx),
            forward
        );

        let msg = match result {
            Ok(()) => Message::WriteCompleted,
            Err(e) => Message::WriteFailed {
                error: e.to_string(),
            },
        };
        let _ = msg_tx.send(msg).await;
    });

    match ctx.write_task.lock() {
        Ok(mut slot) => {
            if let Some(previous) = slot.replace(handle) {
                // Finished writes leave their handle behind
                if !previous.is_finished() {
                    warn!("Replacing a write task that is still running");
                }
            }
        }
        Err(e) => warn!("Write task slot poisoned: {}", e),
    }
}

/// Persist preferences on one long-lived task.
///
/// Changes are coalesced: the saver always writes the newest snapshot it has
/// not written yet, so the file ends up matching the last change no matter
/// how quickly changes arrive. The task exits once the sender is dropped and
/// every pending snapshot is on disk.
pub fn spawn_preference_saver(
    path: PathBuf,
    initial: Preferences,
    msg_tx: mpsc::Sender<Message>,
) -> (watch::Sender<Preferences>, JoinHandle<()>) {
    let (tx, mut rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let preferences = rx.borrow_and_update().clone();
            let path = path.clone();
            let result =
                tokio::task::spawn_blocking(move || save_preferences_to(&path, &preferences))
                    .await;

            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            warn!("Failed to save preferences: {}", error);
            let _ = msg_tx.send(Message::PreferencesSaveFailed { error }).await;
        }
        debug!("Preference saver stopped");
    });

    (tx, handle)
}
