//! Test utilities for backend consumers
//!
//! Provides helper functions for building devices, images and progress
//! events, plus [`FakeBackend`], a scriptable in-memory [`Backend`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use stickwriter_core::prelude::*;
use stickwriter_core::{
    format_size, BlockDevice, ChecksumAlgorithm, FileInfo, ImageValidation, ProgressPhase,
    WriteProgress,
};
use tokio::sync::{mpsc, oneshot};

use crate::backend::Backend;

/// Creates a removable test device.
///
/// # Arguments
/// * `path` - Device path, e.g. `/dev/sdb`
/// * `size` - Capacity in bytes
pub fn test_device(path: &str, size: u64) -> BlockDevice {
    BlockDevice::new(path, format!("Test Drive {}", path.trim_start_matches("/dev/")), size)
}

/// Creates file metadata for a test image
pub fn test_file_info(path: impl Into<PathBuf>, size: u64) -> FileInfo {
    let path = path.into();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    FileInfo {
        path,
        name,
        size,
        size_human: format_size(size),
    }
}

/// Creates a progress event with zero speed and ETA
pub fn test_progress(phase: ProgressPhase, bytes_written: u64, total_bytes: u64) -> WriteProgress {
    WriteProgress {
        phase,
        bytes_written,
        total_bytes,
        speed_bps: 0,
        eta_seconds: 0,
    }
}

/// Creates a passing validation verdict for `format`
pub fn test_validation(format: &str) -> ImageValidation {
    ImageValidation {
        is_valid: true,
        format: format.to_string(),
        errors: Vec::new(),
        warnings: Vec::new(),
    }
}

/// Arguments of a recorded `write_image` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub iso_path: PathBuf,
    pub device_path: String,
    pub verify: bool,
}

/// Scripted behaviour of `write_image`
#[derive(Debug, Clone)]
struct WriteScript {
    events: Vec<WriteProgress>,
    outcome: std::result::Result<(), String>,
}

impl Default for WriteScript {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            outcome: Ok(()),
        }
    }
}

/// In-memory [`Backend`] with scriptable responses and call recording
#[derive(Debug, Default)]
pub struct FakeBackend {
    devices: Mutex<Vec<BlockDevice>>,
    devices_error: Mutex<Option<String>>,
    files: Mutex<HashMap<PathBuf, FileInfo>>,
    validation: Mutex<Option<ImageValidation>>,
    checksums: Mutex<HashMap<ChecksumAlgorithm, String>>,
    write_script: Mutex<WriteScript>,
    write_gate: Mutex<Option<oneshot::Receiver<()>>>,
    eject_error: Mutex<Option<String>>,

    list_calls: AtomicUsize,
    validate_calls: Mutex<Vec<(PathBuf, Option<u64>)>>,
    checksum_calls: Mutex<Vec<(PathBuf, ChecksumAlgorithm)>>,
    write_calls: Mutex<Vec<WriteCall>>,
    eject_calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────
    // Scripting
    // ─────────────────────────────────────────────────────────

    pub fn with_devices(self, devices: Vec<BlockDevice>) -> Self {
        self.set_devices(devices);
        self
    }

    pub fn with_file(self, info: FileInfo) -> Self {
        self.add_file(info);
        self
    }

    pub fn with_validation(self, validation: ImageValidation) -> Self {
        *lock(&self.validation) = Some(validation);
        self
    }

    pub fn with_checksum(self, algorithm: ChecksumAlgorithm, digest: &str) -> Self {
        lock(&self.checksums).insert(algorithm, digest.to_string());
        self
    }

    /// Replace the set returned by the next enumerations
    pub fn set_devices(&self, devices: Vec<BlockDevice>) {
        *lock(&self.devices) = devices;
        *lock(&self.devices_error) = None;
    }

    /// Make enumeration fail until devices are set again
    pub fn fail_devices(&self, message: &str) {
        *lock(&self.devices_error) = Some(message.to_string());
    }

    pub fn add_file(&self, info: FileInfo) {
        lock(&self.files).insert(info.path.clone(), info);
    }

    /// Progress events each write emits before finishing
    pub fn script_write(&self, events: Vec<WriteProgress>) {
        lock(&self.write_script).events = events;
    }

    /// Make writes fail with `message`
    pub fn fail_write(&self, message: &str) {
        lock(&self.write_script).outcome = Err(message.to_string());
    }

    pub fn fail_eject(&self, message: &str) {
        *lock(&self.eject_error) = Some(message.to_string());
    }

    /// Hold writes after their scripted events until the returned sender fires
    pub fn hold_writes(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *lock(&self.write_gate) = Some(rx);
        tx
    }

    // ─────────────────────────────────────────────────────────
    // Call recording
    // ─────────────────────────────────────────────────────────

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> Vec<(PathBuf, Option<u64>)> {
        lock(&self.validate_calls).clone()
    }

    pub fn checksum_calls(&self) -> Vec<(PathBuf, ChecksumAlgorithm)> {
        lock(&self.checksum_calls).clone()
    }

    pub fn write_calls(&self) -> Vec<WriteCall> {
        lock(&self.write_calls).clone()
    }

    pub fn eject_calls(&self) -> Vec<String> {
        lock(&self.eject_calls).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Backend for FakeBackend {
    async fn list_devices(&self) -> Result<Vec<BlockDevice>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = lock(&self.devices_error).clone() {
            return Err(Error::backend(message));
        }
        Ok(lock(&self.devices).clone())
    }

    async fn get_file_info(&self, path: &Path) -> Result<FileInfo> {
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| Error::file_read(path, "No such file or directory"))
    }

    async fn validate_image(
        &self,
        path: &Path,
        device_size: Option<u64>,
    ) -> Result<ImageValidation> {
        lock(&self.validate_calls).push((path.to_path_buf(), device_size));
        lock(&self.validation)
            .clone()
            .ok_or_else(|| Error::backend("validation not scripted"))
    }

    async fn calculate_checksum(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        lock(&self.checksum_calls).push((path.to_path_buf(), algorithm));
        lock(&self.checksums)
            .get(&algorithm)
            .cloned()
            .ok_or_else(|| Error::UnsupportedAlgorithm(algorithm.to_string()))
    }

    async fn write_image(
        &self,
        iso_path: &Path,
        device_path: &str,
        verify: bool,
        progress: mpsc::Sender<WriteProgress>,
    ) -> Result<()> {
        lock(&self.write_calls).push(WriteCall {
            iso_path: iso_path.to_path_buf(),
            device_path: device_path.to_string(),
            verify,
        });

        let script = lock(&self.write_script).clone();
        for event in script.events {
            let _ = progress.send(event).await;
        }

        let gate = lock(&self.write_gate).take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        script.outcome.map_err(Error::backend)
    }

    async fn eject_device(&self, device_path: &str) -> Result<()> {
        lock(&self.eject_calls).push(device_path.to_string());
        let error = lock(&self.eject_error).clone();
        match error {
            Some(message) => Err(Error::command(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_defaults() {
        let device = test_device("/dev/sdb", 8 * 1024 * 1024 * 1024);
        assert_eq!(device.path, "/dev/sdb");
        assert_eq!(device.name, "Test Drive sdb");
        assert_eq!(device.size_human, "8.0 GB");
        assert!(device.removable);
    }

    #[test]
    fn test_file_info_name_from_path() {
        let info = test_file_info("/images/debian.iso", 1024);
        assert_eq!(info.name, "debian.iso");
        assert_eq!(info.size_human, "1.0 KB");
    }

    #[tokio::test]
    async fn test_fake_backend_counts_enumerations() {
        let backend = FakeBackend::new().with_devices(vec![test_device("/dev/sdb", 1024)]);
        assert_eq!(backend.list_devices().await.unwrap().len(), 1);
        backend.fail_devices("boom");
        assert!(backend.list_devices().await.is_err());
        assert_eq!(backend.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_fake_backend_write_emits_script() {
        let backend = FakeBackend::new();
        backend.script_write(vec![
            test_progress(ProgressPhase::Writing, 50, 100),
            test_progress(ProgressPhase::Verifying, 10, 100),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        backend
            .write_image(Path::new("/images/a.iso"), "/dev/sdb", true, tx)
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().phase, ProgressPhase::Writing);
        assert_eq!(rx.recv().await.unwrap().phase, ProgressPhase::Verifying);
        assert!(rx.recv().await.is_none());
        assert_eq!(
            backend.write_calls(),
            vec![WriteCall {
                iso_path: PathBuf::from("/images/a.iso"),
                device_path: "/dev/sdb".to_string(),
                verify: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_fake_backend_failed_write_reports_message() {
        let backend = FakeBackend::new();
        backend.fail_write("Permission denied");
        let (tx, _rx) = mpsc::channel(8);

        let err = backend
            .write_image(Path::new("/images/a.iso"), "/dev/sdb", false, tx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
    }
}
