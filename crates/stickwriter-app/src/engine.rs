//! Engine - orchestration shared by every front-end
//!
//! The Engine owns the [`AppState`], the message channel, the action context
//! handed to background tasks, the device poller and the event broadcaster.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stickwriter_backend::Backend;
use stickwriter_core::prelude::*;
use stickwriter_core::{WritePhase, WriteProgress};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::actions::{spawn_preference_saver, ActionContext, WriteTaskSlot};
use crate::config::{self, Preferences};
use crate::engine_event::EngineEvent;
use crate::message::Message;
use crate::poller::DevicePoller;
use crate::process;
use crate::signals;
use crate::state::{AppState, ChecksumVerdict, ValidationKey};

/// How long shutdown waits for an aborted write task
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    phase: WritePhase,
    progress: Option<WriteProgress>,
    device_generation: u64,
    selected_device: Option<String>,
    image_path: Option<PathBuf>,
    validation: Option<ValidationKey>,
    checksum: Option<String>,
    dialog_open: bool,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        Self {
            phase: state.write.phase,
            progress: state.write.progress,
            device_generation: state.devices.generation,
            selected_device: state.selected_device.as_ref().map(|d| d.path.clone()),
            image_path: state.selected_image_path().map(|p| p.to_path_buf()),
            validation: state.validation.result.as_ref().map(|(key, _)| key.clone()),
            checksum: state.checksum.calculated.clone(),
            dialog_open: state.confirm_dialog.is_some(),
        }
    }
}

/// Orchestration engine for stickwriter.
///
/// Front-ends feed [`Message`]s through [`Engine::process_message`] and
/// observe [`EngineEvent`]s via [`Engine::subscribe`].
pub struct Engine<B> {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources (signal handler, poller, stdin).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Sender for the shutdown signal. Send `true` to initiate shutdown.
    pub shutdown_tx: watch::Sender<bool>,

    /// Receiver for the shutdown signal. Clone for background tasks.
    pub shutdown_rx: watch::Receiver<bool>,

    /// Passed to every action
    ctx: ActionContext<B>,

    /// Present while polling runs
    poller: Option<DevicePoller>,

    polling_enabled: bool,

    /// Preference saver task, when preferences are persisted
    saver: Option<JoinHandle<()>>,

    /// Event broadcaster for external consumers
    event_tx: broadcast::Sender<EngineEvent>,
}

impl<B> Engine<B>
where
    B: Backend + Sync + 'static,
{
    /// Create an Engine with preferences from the default location.
    pub fn new(backend: Arc<B>) -> Self {
        let preferences = config::load_preferences();
        Self::with_preferences(backend, preferences, config::preferences_path())
    }

    /// Create an Engine with explicit preferences.
    ///
    /// `preferences_path` of `None` keeps changes in memory.
    pub fn with_preferences(
        backend: Arc<B>,
        preferences: Preferences,
        preferences_path: Option<PathBuf>,
    ) -> Self {
        let state = AppState::with_preferences(preferences);

        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        signals::spawn_signal_handler(msg_tx.clone());

        let (preferences_tx, saver) = match preferences_path {
            Some(path) => {
                let (tx, handle) =
                    spawn_preference_saver(path, state.preferences.clone(), msg_tx.clone());
                (Some(tx), Some(handle))
            }
            None => (None, None),
        };

        let write_task: WriteTaskSlot = Arc::new(std::sync::Mutex::new(None));
        let ctx = ActionContext {
            backend,
            msg_tx: msg_tx.clone(),
            event_tx: event_tx.clone(),
            write_task,
            preferences_tx,
        };

        Self {
            state,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            ctx,
            poller: None,
            polling_enabled: false,
            saver,
            event_tx,
        }
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Enumerate now and every poll interval while no write is running
    pub fn start_polling(&mut self) {
        self.polling_enabled = true;
        self.reconcile_poller();
    }

    pub fn stop_polling(&mut self) {
        self.polling_enabled = false;
        self.reconcile_poller();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Process a single message through the TEA update cycle.
    ///
    /// Emits EngineEvents based on state changes detected by comparing
    /// before/after snapshots, then starts or stops the device poller to
    /// match the new write phase.
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);

        process::process_message(&mut self.state, msg, &self.ctx);

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);
        self.reconcile_poller();
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Stop polling, flush preferences, signal background tasks and abort a
    /// running write.
    ///
    /// The write lifecycle has no cancel transition; aborting here only
    /// releases the task owned by the engine.
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        self.stop_polling();

        let _ = self.shutdown_tx.send(true);

        // Dropping the sender lets the saver finish the last change and exit
        self.ctx.preferences_tx = None;
        if let Some(saver) = self.saver.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, saver).await.is_err() {
                warn!("Preference saver did not finish in time");
            }
        }

        let handle = match self.ctx.write_task.lock() {
            Ok(mut slot) => slot.take(),
            Err(e) => {
                warn!("Write task slot poisoned: {}", e);
                None
            }
        };

        if let Some(handle) = handle {
            if !handle.is_finished() {
                warn!("Aborting write in progress");
                handle.abort();
            }
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("Write task finished"),
                Ok(Err(e)) if e.is_cancelled() => debug!("Write task aborted"),
                Ok(Err(e)) => warn!("Write task panicked: {}", e),
                Err(_) => warn!("Write task cleanup timed out"),
            }
        }
    }

    /// Spawn or drop the poller to match `polling_enabled` and the phase
    fn reconcile_poller(&mut self) {
        let wanted =
            self.polling_enabled && !self.state.is_writing() && !self.state.should_quit();

        match (wanted, self.poller.is_some()) {
            (true, false) => {
                self.poller = Some(DevicePoller::spawn(
                    self.msg_tx.clone(),
                    self.shutdown_rx.clone(),
                ));
            }
            (false, true) => {
                debug!("Device polling suspended");
                self.poller = None;
            }
            _ => {}
        }
    }

    /// Emit EngineEvents based on state changes after processing.
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        let state = &self.state;

        // Devices
        if pre.device_generation != post.device_generation {
            self.emit(EngineEvent::DevicesUpdated {
                devices: state.devices.devices.clone(),
            });

            if let (Some(device_path), None) = (&pre.selected_device, &post.selected_device) {
                self.emit(EngineEvent::SelectionCleared {
                    device_path: device_path.clone(),
                });
            }
        }

        // Image
        if pre.image_path != post.image_path {
            if let Some(image) = &state.selected_image {
                self.emit(EngineEvent::ImageSelected {
                    info: image.clone(),
                });
            }
        }

        if pre.validation != post.validation {
            if let Some((key, result)) = &state.validation.result {
                self.emit(EngineEvent::ValidationCompleted {
                    path: key.path.clone(),
                    result: result.clone(),
                });
            }
        }

        if pre.checksum != post.checksum {
            if let Some(digest) = &post.checksum {
                self.emit(EngineEvent::ChecksumCalculated {
                    algorithm: state.checksum.algorithm,
                    digest: digest.clone(),
                    matches: state
                        .checksum
                        .verdict()
                        .map(|v| v == ChecksumVerdict::Match),
                });
            }
        }

        // Confirmation
        if !pre.dialog_open && post.dialog_open {
            if let Some(dialog) = &state.confirm_dialog {
                self.emit(EngineEvent::ConfirmationRequested {
                    title: dialog.title.clone(),
                    message: dialog.message.clone(),
                });
            }
        }

        // Write lifecycle
        if pre.phase != post.phase {
            self.emit(EngineEvent::PhaseChanged {
                old_phase: pre.phase,
                new_phase: post.phase,
            });
        }

        if pre.progress != post.progress {
            if let Some(progress) = post.progress {
                self.emit(EngineEvent::Progress {
                    progress,
                    percent: progress.percent(),
                });
            }
        }

        if pre.phase != post.phase {
            match post.phase {
                WritePhase::Complete => self.on_write_completed(),
                WritePhase::Error => self.on_write_failed(),
                _ => {}
            }
        }
    }

    fn on_write_completed(&self) {
        let device_path = self.state.write.target_device.clone();
        self.emit(EngineEvent::WriteCompleted {
            device_path: device_path.clone(),
        });

        if self.state.preferences.show_notification {
            let image = self
                .state
                .selected_image
                .as_ref()
                .map(|i| i.name.as_str())
                .unwrap_or("The image");
            let device = device_path.as_deref().unwrap_or("the device");
            self.emit(EngineEvent::Notification {
                title: "Write complete".to_string(),
                body: format!("{} was written to {}.", image, device),
            });
        }
    }

    fn on_write_failed(&self) {
        let error = self
            .state
            .write
            .error
            .clone()
            .unwrap_or_else(|| "An error occurred.".to_string());
        self.emit(EngineEvent::WriteFailed {
            error: error.clone(),
        });

        if self.state.preferences.show_notification {
            self.emit(EngineEvent::Notification {
                title: "Write failed".to_string(),
                body: error,
            });
        }
    }

    /// Emit a single event. No subscribers is not an error.
    fn emit(&self, event: EngineEvent) {
        trace!("Engine event: {}", event.event_type());
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use stickwriter_backend::test_utils::{test_device, test_file_info, test_progress, FakeBackend};
    use stickwriter_core::{AppMode, ProgressPhase, Theme};

    const GB: u64 = 1024 * 1024 * 1024;

    fn engine(backend: &Arc<FakeBackend>) -> Engine<FakeBackend> {
        Engine::with_preferences(backend.clone(), Preferences::default(), None)
    }

    fn fake_with_image() -> Arc<FakeBackend> {
        Arc::new(
            FakeBackend::new()
                .with_devices(vec![test_device("/dev/sdb", 16 * GB)])
                .with_file(test_file_info("/images/debian.iso", GB)),
        )
    }

    /// Enumerate, select `/dev/sdb` and the image, then confirm a write
    async fn start_write(engine: &mut Engine<FakeBackend>) {
        engine.process_message(Message::RefreshDevices);
        pump_until(engine, |s| !s.devices.loading).await;
        engine.process_message(Message::SelectDevice {
            path: "/dev/sdb".to_string(),
        });
        engine.process_message(Message::SelectImage {
            path: PathBuf::from("/images/debian.iso"),
        });
        pump_until(engine, |s| s.selected_image.is_some()).await;
        engine.process_message(Message::RequestWrite);
        engine.process_message(Message::ConfirmWrite);
    }

    fn drain_events(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Process channel messages until `done` holds
    async fn pump_until(engine: &mut Engine<FakeBackend>, done: impl Fn(&AppState) -> bool) {
        while !done(&engine.state) {
            let msg = tokio::time::timeout(Duration::from_secs(5), engine.msg_rx.recv())
                .await
                .expect("timed out waiting for message")
                .expect("channel closed");
            engine.process_message(msg);
        }
    }

    #[tokio::test]
    async fn test_new_engine_is_idle() {
        let engine = engine(&Arc::new(FakeBackend::new()));
        assert_eq!(engine.state.write.phase, WritePhase::Idle);
        assert!(!engine.is_polling());
        assert!(!engine.should_quit());
    }

    #[tokio::test]
    async fn test_device_refresh_emits_update() {
        let backend = fake_with_image();
        let mut engine = engine(&backend);
        let mut events = engine.subscribe();

        engine.process_message(Message::RefreshDevices);
        pump_until(&mut engine, |s| !s.devices.loading).await;

        assert_eq!(engine.state.devices.devices.len(), 1);
        let events = drain_events(&mut events);
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::DevicesUpdated { devices } if devices.len() == 1)));
    }

    #[tokio::test]
    async fn test_unplug_emits_selection_cleared() {
        let backend = fake_with_image();
        let mut engine = engine(&backend);
        engine.process_message(Message::RefreshDevices);
        pump_until(&mut engine, |s| !s.devices.loading).await;
        engine.process_message(Message::SelectDevice {
            path: "/dev/sdb".to_string(),
        });

        let mut events = engine.subscribe();
        backend.set_devices(vec![]);
        engine.process_message(Message::RefreshDevices);
        pump_until(&mut engine, |s| !s.devices.loading).await;

        assert!(engine.state.selected_device.is_none());
        let events = drain_events(&mut events);
        assert!(events.iter().any(
            |e| matches!(e, EngineEvent::SelectionCleared { device_path } if device_path == "/dev/sdb")
        ));
    }

    #[tokio::test]
    async fn test_theme_change_emits_theme_applied() {
        let mut engine = engine(&Arc::new(FakeBackend::new()));
        let mut events = engine.subscribe();

        engine.process_message(Message::SetTheme { theme: Theme::Dark });

        let events = drain_events(&mut events);
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::ThemeApplied { theme: Theme::Dark })));
    }

    #[tokio::test]
    async fn test_full_write_emits_lifecycle_events() {
        let backend = fake_with_image();
        backend.script_write(vec![
            test_progress(ProgressPhase::Writing, 50, 100),
            test_progress(ProgressPhase::Verifying, 10, 100),
        ]);
        let mut engine = engine(&backend);
        let mut events = engine.subscribe();

        start_write(&mut engine).await;
        pump_until(&mut engine, |s| s.write.phase.is_finished()).await;

        assert_eq!(engine.state.write.phase, WritePhase::Complete);
        let calls = backend.write_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].iso_path, Path::new("/images/debian.iso"));
        assert!(calls[0].verify);

        let events = drain_events(&mut events);
        let phases: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::PhaseChanged { new_phase, .. } => Some(*new_phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                WritePhase::Preparing,
                WritePhase::Writing,
                WritePhase::Verifying,
                WritePhase::Complete
            ]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Notification { title, .. } if title == "Write complete"
        )));
    }

    #[tokio::test]
    async fn test_failed_write_emits_notification() {
        let backend = fake_with_image();
        backend.fail_write("disk unplugged");
        let mut engine = engine(&backend);
        let mut events = engine.subscribe();

        start_write(&mut engine).await;
        pump_until(&mut engine, |s| s.write.phase.is_finished()).await;

        assert_eq!(engine.state.write.phase, WritePhase::Error);
        let events = drain_events(&mut events);
        assert!(events.iter().any(
            |e| matches!(e, EngineEvent::WriteFailed { error } if error.contains("disk unplugged"))
        ));
        assert!(events.iter().any(
            |e| matches!(e, EngineEvent::Notification { title, .. } if title == "Write failed")
        ));
    }

    #[tokio::test]
    async fn test_notification_disabled() {
        let backend = fake_with_image();
        let prefs = Preferences {
            show_notification: false,
            ..Default::default()
        };
        let mut engine = Engine::with_preferences(backend.clone(), prefs, None);
        let mut events = engine.subscribe();

        start_write(&mut engine).await;
        pump_until(&mut engine, |s| s.write.phase.is_finished()).await;

        assert!(!drain_events(&mut events)
            .iter()
            .any(|e| matches!(e, EngineEvent::Notification { .. })));
    }

    #[tokio::test]
    async fn test_auto_eject_after_write() {
        let backend = fake_with_image();
        let prefs = Preferences {
            mode: AppMode::Advanced,
            auto_eject: true,
            ..Default::default()
        };
        let mut engine = Engine::with_preferences(backend.clone(), prefs, None);

        start_write(&mut engine).await;
        pump_until(&mut engine, |s| s.write.phase.is_finished()).await;

        // Eject runs in the background after completion
        for _ in 0..100 {
            if !backend.eject_calls().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(backend.eject_calls(), vec!["/dev/sdb".to_string()]);
    }

    #[tokio::test]
    async fn test_polling_suspended_while_writing() {
        let backend = fake_with_image();
        let release = backend.hold_writes();
        let mut engine = engine(&backend);

        engine.start_polling();
        assert!(engine.is_polling());
        pump_until(&mut engine, |s| s.devices.generation > 0).await;

        engine.process_message(Message::SelectDevice {
            path: "/dev/sdb".to_string(),
        });
        engine.process_message(Message::SelectImage {
            path: PathBuf::from("/images/debian.iso"),
        });
        pump_until(&mut engine, |s| s.selected_image.is_some()).await;
        engine.process_message(Message::RequestWrite);
        engine.process_message(Message::ConfirmWrite);
        assert!(!engine.is_polling());

        let _ = release.send(());
        pump_until(&mut engine, |s| s.write.phase.is_finished()).await;
        assert!(engine.is_polling());

        engine.shutdown().await;
        assert!(!engine.is_polling());
    }

    #[tokio::test]
    async fn test_preferences_saved_on_change() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("preferences.toml");
        let backend = Arc::new(FakeBackend::new());
        let mut engine =
            Engine::with_preferences(backend, Preferences::default(), Some(path.clone()));

        engine.process_message(Message::SetAutoEject { enabled: true });

        for _ in 0..100 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(config::load_preferences_from(&path).auto_eject);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rapid_preference_changes_persist_last_value() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("preferences.toml");
        let backend = Arc::new(FakeBackend::new());
        let mut engine =
            Engine::with_preferences(backend, Preferences::default(), Some(path.clone()));

        engine.process_message(Message::SetAutoEject { enabled: true });
        engine.process_message(Message::SetAutoEject { enabled: false });
        engine.process_message(Message::SetAutoEject { enabled: true });
        engine.process_message(Message::SetAutoEject { enabled: false });
        engine.process_message(Message::SetShowNotification { enabled: false });

        engine.shutdown().await;

        let saved = config::load_preferences_from(&path);
        assert!(!saved.auto_eject);
        assert!(!saved.show_notification);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_running_write() {
        let backend = fake_with_image();
        let _release = backend.hold_writes();
        let mut engine = engine(&backend);
        let mut events = engine.subscribe();

        start_write(&mut engine).await;
        assert!(engine.state.is_writing());

        tokio::time::timeout(Duration::from_secs(5), engine.shutdown())
            .await
            .expect("shutdown hung");

        assert!(*engine.shutdown_rx.borrow());
        assert!(drain_events(&mut events)
            .iter()
            .any(|e| matches!(e, EngineEvent::Shutdown)));
    }
}
