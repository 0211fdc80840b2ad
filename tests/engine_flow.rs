//! End-to-end engine flows over the in-memory backend
//!
//! Drives `Engine` the way a front-end does: send messages, pump the
//! channel, and watch the broadcast event stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stickwriter::HeadlessEvent;
use stickwriter_app::{Engine, EngineEvent, Message, Preferences};
use stickwriter_backend::test_utils::{
    test_device, test_file_info, test_progress, test_validation, FakeBackend,
};
use stickwriter_core::{AppMode, ChecksumAlgorithm, ProgressPhase, WritePhase};
use tokio::sync::broadcast;

const GB: u64 = 1024 * 1024 * 1024;

fn backend() -> Arc<FakeBackend> {
    Arc::new(
        FakeBackend::new()
            .with_devices(vec![
                test_device("/dev/sdb", 16 * GB),
                test_device("/dev/sdc", 32 * GB),
            ])
            .with_file(test_file_info("/images/debian.iso", GB))
            .with_validation(test_validation("iso9660"))
            .with_checksum(ChecksumAlgorithm::Sha256, "ab12cd34"),
    )
}

/// Process channel messages until `done` holds for the engine state
async fn pump<F>(engine: &mut Engine<FakeBackend>, mut done: F)
where
    F: FnMut(&Engine<FakeBackend>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(engine) {
            let msg = engine.msg_rx.recv().await.expect("channel open");
            engine.process_message(msg);
        }
    })
    .await
    .expect("engine did not settle");
}

fn drain(events: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn phases(events: &[EngineEvent]) -> Vec<WritePhase> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::PhaseChanged { new_phase, .. } => Some(*new_phase),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_basic_write_lifecycle() {
    let backend = backend();
    backend.script_write(vec![
        test_progress(ProgressPhase::Writing, GB / 2, GB),
        test_progress(ProgressPhase::Writing, GB, GB),
        test_progress(ProgressPhase::Verifying, GB / 2, GB),
    ]);
    let mut engine = Engine::with_preferences(backend.clone(), Preferences::default(), None);
    let mut events = engine.subscribe();

    engine.process_message(Message::RefreshDevices);
    pump(&mut engine, |e| !e.state.devices.loading).await;
    assert_eq!(engine.state.devices.devices.len(), 2);

    engine.process_message(Message::SelectDevice {
        path: "/dev/sdc".to_string(),
    });
    engine.process_message(Message::SelectImage {
        path: PathBuf::from("/images/debian.iso"),
    });
    pump(&mut engine, |e| e.state.selected_image.is_some()).await;

    // Basic mode never validates
    assert!(backend.validate_calls().is_empty());

    engine.process_message(Message::RequestWrite);
    let dialog = engine.state.confirm_dialog.clone().expect("dialog open");
    assert!(dialog.message.contains("32.0 GB"));

    engine.process_message(Message::ConfirmWrite);
    pump(&mut engine, |e| e.state.write.phase.is_finished()).await;

    assert_eq!(engine.state.write.phase, WritePhase::Complete);
    assert_eq!(backend.write_calls()[0].device_path, "/dev/sdc");

    let events = drain(&mut events);
    assert_eq!(
        phases(&events),
        vec![
            WritePhase::Preparing,
            WritePhase::Writing,
            WritePhase::Verifying,
            WritePhase::Complete,
        ]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::ConfirmationRequested { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::WriteCompleted { device_path: Some(p) } if p == "/dev/sdc"
    )));

    // Every event renders for the headless front-end
    for event in &events {
        assert!(HeadlessEvent::from_engine_event(event).is_some());
    }

    engine.shutdown().await;
}

#[tokio::test]
async fn test_advanced_mode_validates_and_checks_digest() {
    let backend = backend();
    let prefs = Preferences {
        mode: AppMode::Advanced,
        ..Default::default()
    };
    let mut engine = Engine::with_preferences(backend.clone(), prefs, None);
    let mut events = engine.subscribe();

    engine.process_message(Message::RefreshDevices);
    pump(&mut engine, |e| !e.state.devices.loading).await;
    engine.process_message(Message::SelectDevice {
        path: "/dev/sdb".to_string(),
    });
    engine.process_message(Message::SelectImage {
        path: PathBuf::from("/images/debian.iso"),
    });
    pump(&mut engine, |e| {
        e.state.selected_image.is_some() && !e.state.validation.is_loading()
    })
    .await;

    let (_, result) = engine.state.validation.result.clone().expect("validated");
    assert!(result.is_valid);
    assert_eq!(
        backend.validate_calls(),
        vec![(PathBuf::from("/images/debian.iso"), Some(16 * GB))]
    );

    engine.process_message(Message::SetExpectedChecksum {
        value: " AB12CD34 ".to_string(),
    });
    engine.process_message(Message::CalculateChecksum);
    pump(&mut engine, |e| !e.state.checksum.is_loading()).await;

    let checksum = drain(&mut events).into_iter().find_map(|e| match e {
        EngineEvent::ChecksumCalculated { digest, matches, .. } => Some((digest, matches)),
        _ => None,
    });
    assert_eq!(checksum, Some(("ab12cd34".to_string(), Some(true))));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_unplugged_device_blocks_write() {
    let backend = backend();
    let mut engine = Engine::with_preferences(backend.clone(), Preferences::default(), None);
    let mut events = engine.subscribe();

    engine.process_message(Message::RefreshDevices);
    pump(&mut engine, |e| !e.state.devices.loading).await;
    engine.process_message(Message::SelectDevice {
        path: "/dev/sdb".to_string(),
    });
    engine.process_message(Message::SelectImage {
        path: PathBuf::from("/images/debian.iso"),
    });
    pump(&mut engine, |e| e.state.selected_image.is_some()).await;

    backend.set_devices(vec![test_device("/dev/sdc", 32 * GB)]);
    engine.process_message(Message::RefreshDevices);
    pump(&mut engine, |e| !e.state.devices.loading).await;

    assert!(engine.state.selected_device.is_none());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        EngineEvent::SelectionCleared { device_path } if device_path == "/dev/sdb"
    )));

    engine.process_message(Message::RequestWrite);
    assert!(engine.state.confirm_dialog.is_none());
    assert!(backend.write_calls().is_empty());

    engine.shutdown().await;
}
