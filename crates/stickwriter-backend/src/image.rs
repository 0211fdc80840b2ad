//! Source image metadata and format inspection
//!
//! Validation only looks at the first few sectors of an image. It recognises
//! the layouts that boot from a USB stick (ISO 9660, hybrid ISO, GPT, MBR)
//! and flags compressed archives, which would be written byte-for-byte and
//! never boot.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use stickwriter_core::prelude::*;
use stickwriter_core::{format_size, FileInfo, ImageValidation};

/// Bytes needed to see the ISO 9660 primary volume descriptor
const HEADER_LEN: usize = 0x8800;

/// ISO 9660 standard identifier, at offset 1 of the first volume descriptor (sector 16)
const ISO9660_MAGIC: &[u8] = b"CD001";
const ISO9660_OFFSET: usize = 0x8001;

/// GPT header signature at LBA 1
const GPT_MAGIC: &[u8] = b"EFI PART";
const GPT_OFFSET: usize = 512;

/// MBR boot signature at the end of sector 0
const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];
const MBR_SIGNATURE_OFFSET: usize = 510;

const SECTOR_SIZE: u64 = 512;

/// Archive containers that need decompressing before they can be written
const COMPRESSED_MAGICS: &[(&str, &[u8])] = &[
    ("gzip", &[0x1F, 0x8B]),
    ("xz", &[0xFD, b'7', b'z', b'X', b'Z', 0x00]),
    ("zstd", &[0x28, 0xB5, 0x2F, 0xFD]),
    ("bzip2", b"BZh"),
    ("zip", b"PK\x03\x04"),
];

/// Image layout detected from header bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// ISO 9660 that also carries an MBR, so it boots from a USB stick
    HybridIso,
    Iso9660,
    Gpt,
    Mbr,
    Compressed(&'static str),
    Unknown,
}

impl ImageFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ImageFormat::HybridIso => "iso9660-hybrid",
            ImageFormat::Iso9660 => "iso9660",
            ImageFormat::Gpt => "gpt",
            ImageFormat::Mbr => "mbr",
            ImageFormat::Compressed(kind) => kind,
            ImageFormat::Unknown => "unknown",
        }
    }
}

fn has_bytes_at(header: &[u8], offset: usize, expected: &[u8]) -> bool {
    header
        .get(offset..offset + expected.len())
        .is_some_and(|actual| actual == expected)
}

/// Detect the layout of an image from its leading bytes
pub fn detect_format(header: &[u8]) -> ImageFormat {
    for (kind, magic) in COMPRESSED_MAGICS {
        if header.starts_with(magic) {
            return ImageFormat::Compressed(kind);
        }
    }

    let is_iso = has_bytes_at(header, ISO9660_OFFSET, ISO9660_MAGIC);
    let has_mbr = has_bytes_at(header, MBR_SIGNATURE_OFFSET, &MBR_SIGNATURE);

    if is_iso && has_mbr {
        ImageFormat::HybridIso
    } else if is_iso {
        ImageFormat::Iso9660
    } else if has_bytes_at(header, GPT_OFFSET, GPT_MAGIC) {
        ImageFormat::Gpt
    } else if has_mbr {
        ImageFormat::Mbr
    } else {
        ImageFormat::Unknown
    }
}

/// Build a verdict from the image header, its size and the target device size
pub fn assess_image(header: &[u8], image_size: u64, device_size: Option<u64>) -> ImageValidation {
    let format = detect_format(header);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if image_size == 0 {
        errors.push(Error::EmptyImage.to_string());
    }

    if let Some(device_size) = device_size.filter(|size| *size > 0) {
        if image_size > device_size {
            errors.push(
                Error::ImageTooLarge {
                    image: format_size(image_size),
                    device: format_size(device_size),
                }
                .to_string(),
            );
        }
    }

    match format {
        ImageFormat::Compressed(kind) => warnings.push(format!(
            "Image looks like a {} archive; decompress it before writing",
            kind
        )),
        ImageFormat::Unknown if image_size > 0 => warnings.push(
            "Unrecognised image format; the drive may not be bootable".to_string(),
        ),
        _ => {}
    }

    if image_size % SECTOR_SIZE != 0 {
        warnings.push(format!(
            "Image size is not a multiple of {} bytes",
            SECTOR_SIZE
        ));
    }

    ImageValidation {
        is_valid: errors.is_empty(),
        format: format.label().to_string(),
        errors,
        warnings,
    }
}

fn regular_file_size(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::file_read(path, e))?;
    if !metadata.is_file() {
        return Err(Error::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(metadata.len())
}

fn read_header(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| Error::file_read(path, e))?;
    Ok(header)
}

/// Read metadata for the image at `path`
pub async fn file_info(path: &Path) -> Result<FileInfo> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let metadata = std::fs::metadata(&path).map_err(|e| Error::file_read(&path, e))?;
        let size = metadata.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(FileInfo {
            path,
            name,
            size,
            size_human: format_size(size),
        })
    })
    .await
    .map_err(|e| Error::task(e.to_string()))?
}

/// Inspect the image at `path`
pub async fn validate_image(path: &Path, device_size: Option<u64>) -> Result<ImageValidation> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let size = regular_file_size(&path)?;
        let header = read_header(&path)?;
        let verdict = assess_image(&header, size, device_size);
        debug!(
            "Validated {}: format={} valid={}",
            path.display(),
            verdict.format,
            verdict.is_valid
        );
        Ok(verdict)
    })
    .await
    .map_err(|e| Error::task(e.to_string()))?
}

/// Size of a writable source image. Rejects directories and empty files.
pub async fn image_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::file_read(path, e))?;
    if !metadata.is_file() {
        return Err(Error::NotAFile {
            path: path.to_path_buf(),
        });
    }
    if metadata.len() == 0 {
        return Err(Error::EmptyImage);
    }
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn blank_header() -> Vec<u8> {
        vec![0u8; HEADER_LEN]
    }

    fn iso_header() -> Vec<u8> {
        let mut header = blank_header();
        header[ISO9660_OFFSET..ISO9660_OFFSET + 5].copy_from_slice(ISO9660_MAGIC);
        header
    }

    fn with_mbr(mut header: Vec<u8>) -> Vec<u8> {
        header[MBR_SIGNATURE_OFFSET..MBR_SIGNATURE_OFFSET + 2].copy_from_slice(&MBR_SIGNATURE);
        header
    }

    #[test]
    fn test_detect_hybrid_iso() {
        assert_eq!(detect_format(&with_mbr(iso_header())), ImageFormat::HybridIso);
    }

    #[test]
    fn test_detect_plain_iso() {
        assert_eq!(detect_format(&iso_header()), ImageFormat::Iso9660);
    }

    #[test]
    fn test_detect_gpt_before_mbr() {
        let mut header = with_mbr(blank_header());
        header[GPT_OFFSET..GPT_OFFSET + 8].copy_from_slice(GPT_MAGIC);
        assert_eq!(detect_format(&header), ImageFormat::Gpt);
    }

    #[test]
    fn test_detect_mbr() {
        assert_eq!(detect_format(&with_mbr(blank_header())), ImageFormat::Mbr);
    }

    #[test]
    fn test_detect_compressed() {
        let header = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(detect_format(&header), ImageFormat::Compressed("gzip"));
        assert_eq!(ImageFormat::Compressed("gzip").label(), "gzip");
    }

    #[test]
    fn test_detect_short_header_is_unknown() {
        assert_eq!(detect_format(&[0u8; 16]), ImageFormat::Unknown);
    }

    #[test]
    fn test_assess_hybrid_iso_is_clean() {
        let verdict = assess_image(&with_mbr(iso_header()), 4 * 1024 * 1024, None);
        assert!(verdict.is_valid);
        assert_eq!(verdict.format, "iso9660-hybrid");
        assert!(verdict.errors.is_empty());
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn test_assess_image_larger_than_device() {
        let verdict = assess_image(&with_mbr(iso_header()), 8 * 1024 * 1024, Some(4 * 1024 * 1024));
        assert!(!verdict.is_valid);
        assert_eq!(
            verdict.errors,
            vec!["Image size (8.0 MB) exceeds device capacity (4.0 MB)".to_string()]
        );
    }

    #[test]
    fn test_assess_ignores_zero_device_size() {
        let verdict = assess_image(&with_mbr(blank_header()), 8 * 1024 * 1024, Some(0));
        assert!(verdict.is_valid);
    }

    #[test]
    fn test_assess_empty_image() {
        let verdict = assess_image(&[], 0, None);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors, vec!["Selected image is empty".to_string()]);
    }

    #[test]
    fn test_assess_unaligned_unknown_image_warns_twice() {
        let verdict = assess_image(&blank_header(), 1000, None);
        assert!(verdict.is_valid);
        assert_eq!(verdict.format, "unknown");
        assert_eq!(verdict.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_validate_image_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&with_mbr(iso_header())).unwrap();
        file.flush().unwrap();

        let verdict = validate_image(file.path(), None).await.unwrap();
        assert_eq!(verdict.format, "iso9660-hybrid");
        assert!(verdict.is_valid);
    }

    #[tokio::test]
    async fn test_validate_image_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_image(dir.path(), None).await.unwrap_err();
        assert!(matches!(err, Error::NotAFile { .. }));
    }

    #[tokio::test]
    async fn test_file_info_reports_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debian.iso");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let info = file_info(&path).await.unwrap();
        assert_eq!(info.name, "debian.iso");
        assert_eq!(info.size, 2048);
        assert_eq!(info.size_human, "2.0 KB");
        assert_eq!(info.path, path);
    }

    #[tokio::test]
    async fn test_image_size_rejects_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = image_size(file.path()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyImage));
    }
}
