//! Byte-level image copy with read-back verification

use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use stickwriter_core::prelude::*;
use stickwriter_core::{ProgressPhase, WriteProgress};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

/// Copy block size
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Derives speed and ETA for one pass over the image
struct ProgressMeter {
    phase: ProgressPhase,
    total_bytes: u64,
    started: Instant,
}

impl ProgressMeter {
    fn start(phase: ProgressPhase, total_bytes: u64) -> Self {
        Self {
            phase,
            total_bytes,
            started: Instant::now(),
        }
    }

    fn snapshot(&self, done: u64) -> WriteProgress {
        let elapsed = self.started.elapsed().as_secs_f64();
        let speed_bps = if elapsed > 0.0 {
            (done as f64 / elapsed) as u64
        } else {
            0
        };
        let remaining = self.total_bytes.saturating_sub(done);
        let eta_seconds = if speed_bps > 0 {
            remaining / speed_bps
        } else {
            0
        };

        WriteProgress {
            phase: self.phase,
            bytes_written: done,
            total_bytes: self.total_bytes,
            speed_bps,
            eta_seconds,
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of file
async fn read_block(reader: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn report(progress: &mpsc::Sender<WriteProgress>, snapshot: WriteProgress) {
    if progress.send(snapshot).await.is_err() {
        trace!("Progress receiver dropped; continuing without reporting");
    }
}

async fn open_target(target: &Path, write: bool) -> Result<File> {
    let result = if write {
        OpenOptions::new().write(true).open(target).await
    } else {
        File::open(target).await
    };

    result.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => Error::permission(format!(
            "Run with elevated privileges to access {}",
            target.display()
        )),
        _ => Error::Io(e),
    })
}

/// Stream `source` onto `target`, then optionally read `target` back and compare.
///
/// `target` must already exist; it is never created or truncated.
pub async fn write_image(
    source: &Path,
    target: &Path,
    total_bytes: u64,
    verify: bool,
    progress: &mpsc::Sender<WriteProgress>,
) -> Result<()> {
    info!(
        "Writing {} to {} ({} bytes, verify={})",
        source.display(),
        target.display(),
        total_bytes,
        verify
    );

    copy_blocks(source, target, total_bytes, progress).await?;

    if verify {
        verify_blocks(source, target, total_bytes, progress).await?;
    }

    info!("Finished writing {}", target.display());
    Ok(())
}

async fn copy_blocks(
    source: &Path,
    target: &Path,
    total_bytes: u64,
    progress: &mpsc::Sender<WriteProgress>,
) -> Result<()> {
    let mut reader = File::open(source)
        .await
        .map_err(|e| Error::file_read(source, e))?;
    let mut writer = open_target(target, true).await?;

    let meter = ProgressMeter::start(ProgressPhase::Writing, total_bytes);
    let mut buffer = vec![0u8; BLOCK_SIZE];
    let mut written: u64 = 0;

    loop {
        let bytes_read = read_block(&mut reader, &mut buffer)
            .await
            .map_err(|e| Error::file_read(source, e))?;
        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .await
            .with_context(|| format!("Writing to {} at byte {}", target.display(), written))?;
        written += bytes_read as u64;
        report(progress, meter.snapshot(written)).await;
    }

    writer.flush().await.context("Flushing device")?;
    writer
        .sync_all()
        .await
        .with_context(|| format!("Syncing {}", target.display()))?;
    Ok(())
}

/// Compare `target` against `source` block by block
pub async fn verify_blocks(
    source: &Path,
    target: &Path,
    total_bytes: u64,
    progress: &mpsc::Sender<WriteProgress>,
) -> Result<()> {
    let mut reader = File::open(source)
        .await
        .map_err(|e| Error::file_read(source, e))?;
    let mut written = open_target(target, false).await?;

    let meter = ProgressMeter::start(ProgressPhase::Verifying, total_bytes);
    let mut expected = vec![0u8; BLOCK_SIZE];
    let mut actual = vec![0u8; BLOCK_SIZE];
    let mut verified: u64 = 0;

    loop {
        let bytes_read = read_block(&mut reader, &mut expected)
            .await
            .map_err(|e| Error::file_read(source, e))?;
        if bytes_read == 0 {
            break;
        }

        written
            .read_exact(&mut actual[..bytes_read])
            .await
            .with_context(|| format!("Reading back {} at byte {}", target.display(), verified))?;

        if let Some(index) = expected[..bytes_read]
            .iter()
            .zip(&actual[..bytes_read])
            .position(|(a, b)| a != b)
        {
            let offset = verified + index as u64;
            warn!("Verification mismatch at byte {}", offset);
            return Err(Error::VerificationMismatch { offset });
        }

        verified += bytes_read as u64;
        report(progress, meter.snapshot(verified)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn drain(rx: &mut mpsc::Receiver<WriteProgress>) -> Vec<WriteProgress> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn setup(image: &[u8]) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("image.iso");
        let target = dir.path().join("device.img");
        std::fs::write(&source, image).unwrap();
        std::fs::write(&target, b"").unwrap();
        (dir, source, target)
    }

    #[tokio::test]
    async fn test_write_and_verify_copies_bytes() {
        let image = patterned(BLOCK_SIZE * 2 + 1000);
        let (_dir, source, target) = setup(&image);
        let (tx, mut rx) = mpsc::channel(64);

        write_image(&source, &target, image.len() as u64, true, &tx)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), image);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 6);
        assert!(events[..3].iter().all(|e| e.phase == ProgressPhase::Writing));
        assert!(events[3..].iter().all(|e| e.phase == ProgressPhase::Verifying));
        assert_eq!(events[2].bytes_written, image.len() as u64);
        assert_eq!(events[5].bytes_written, image.len() as u64);
        assert!(events.iter().all(|e| e.total_bytes == image.len() as u64));
    }

    #[tokio::test]
    async fn test_write_without_verify_reports_writing_only() {
        let image = patterned(4096);
        let (_dir, source, target) = setup(&image);
        let (tx, mut rx) = mpsc::channel(64);

        write_image(&source, &target, image.len() as u64, false, &tx)
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, ProgressPhase::Writing);
        assert_eq!(events[0].percent(), 100);
    }

    #[tokio::test]
    async fn test_verify_reports_first_mismatch() {
        let image = patterned(8192);
        let (_dir, source, target) = setup(&image);
        let mut corrupted = image.clone();
        corrupted[5000] ^= 0xFF;
        std::fs::write(&target, &corrupted).unwrap();
        let (tx, _rx) = mpsc::channel(64);

        let err = verify_blocks(&source, &target, image.len() as u64, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VerificationMismatch { offset: 5000 }));
    }

    #[tokio::test]
    async fn test_write_continues_when_receiver_dropped() {
        let image = patterned(4096);
        let (_dir, source, target) = setup(&image);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        write_image(&source, &target, image.len() as u64, true, &tx)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), image);
    }

    #[tokio::test]
    async fn test_missing_target_is_an_error() {
        let image = patterned(512);
        let (dir, source, _target) = setup(&image);
        let (tx, _rx) = mpsc::channel(8);

        let result = write_image(&source, &dir.path().join("absent"), 512, false, &tx).await;
        assert!(result.is_err());
    }
}
