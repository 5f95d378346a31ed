//! SHA-256 content fingerprints
//!
//! A fingerprint is a change-detection digest: two files with equal
//! fingerprints are treated as having identical content. The canonical
//! rendering is `sha256:<hex>`.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Prefix for all fingerprints produced by this module
const PREFIX: &str = "sha256:";

/// Read buffer used when streaming a file through the hasher
const CHUNK_SIZE: usize = 64 * 1024;

/// Opaque, fixed-length digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", PREFIX)?;
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(content: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(content);
    finish(hasher)
}

/// Fingerprint a file's contents, streaming it in fixed-size chunks.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(finish(hasher))
}

fn finish(hasher: Sha256) -> Fingerprint {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Fingerprint(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_has_prefix() {
        let fp = fingerprint_bytes(b"hello world");
        assert!(fp.to_string().starts_with("sha256:"));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint_bytes(b"test"), fingerprint_bytes(b"test"));
    }

    #[test]
    fn different_content_different_fingerprint() {
        assert_ne!(fingerprint_bytes(b"aaa"), fingerprint_bytes(b"bbb"));
    }

    #[test]
    fn fingerprint_known_value() {
        assert_eq!(
            fingerprint_bytes(b"hello world").to_string(),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn file_fingerprint_matches_bytes_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        assert_eq!(fingerprint_file(&path).unwrap(), fingerprint_bytes(b"hello world"));
    }

    #[test]
    fn file_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(fingerprint_file(&path).unwrap(), fingerprint_bytes(&content));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fingerprint_file(&dir.path().join("absent"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
