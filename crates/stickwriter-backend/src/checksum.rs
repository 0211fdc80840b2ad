//! Streaming file digests

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use md5::Md5;
use sha2::{Digest, Sha256};
use stickwriter_core::prelude::*;
use stickwriter_core::ChecksumAlgorithm;

/// Read buffer size. Large reads keep hashing throughput close to disk speed.
const BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Hash everything `reader` yields, returning a lowercase hex digest
pub fn digest_reader<R: Read>(reader: R, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    match algorithm {
        ChecksumAlgorithm::Sha256 => hash_with::<Sha256, _>(reader),
        ChecksumAlgorithm::Md5 => hash_with::<Md5, _>(reader),
    }
}

fn hash_with<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect())
}

/// Digest a file on a blocking thread
pub async fn calculate_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
    let path: PathBuf = path.to_path_buf();
    debug!("Calculating {} of {}", algorithm, path.display());

    tokio::task::spawn_blocking(move || {
        let file = File::open(&path).map_err(|e| Error::file_read(&path, e))?;
        digest_reader(file, algorithm).map_err(|e| Error::file_read(&path, e))
    })
    .await
    .map_err(|e| Error::task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sha256_known_vector() {
        let digest = digest_reader(&b"abc"[..], ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_md5_known_vector() {
        let digest = digest_reader(&b"abc"[..], ChecksumAlgorithm::Md5).unwrap();
        assert_eq!(digest, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_sha256_empty_input() {
        let digest = digest_reader(io::empty(), ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_calculate_checksum_of_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();

        let digest = calculate_checksum(file.path(), ChecksumAlgorithm::Md5)
            .await
            .unwrap();
        assert_eq!(digest, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn test_calculate_checksum_missing_file() {
        let err = calculate_checksum(Path::new("/nonexistent/image.iso"), ChecksumAlgorithm::Sha256)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
