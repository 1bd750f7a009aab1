#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Artifact checksums for repomirror
//!
//! This crate provides hashing for download validation. The repository
//! index carries MD5 and SHA-256 digests per artifact; both are
//! supported, with SHA-256 preferred when a record offers both.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use repomirror_errors::{Error, StorageError};

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Digest algorithms the repository index carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Digest length in bytes
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A digest value tagged with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checksum {
    Md5([u8; 16]),
    Sha256([u8; 32]),
}

impl Checksum {
    /// Parse from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid hexadecimal or does
    /// not decode to the algorithm's digest length.
    pub fn from_hex(algorithm: ChecksumAlgorithm, s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| StorageError::CorruptedData {
            message: format!("invalid {algorithm} hex: {e}"),
        })?;

        if bytes.len() != algorithm.digest_len() {
            return Err(StorageError::CorruptedData {
                message: format!(
                    "{algorithm} digest must be {} bytes, got {}",
                    algorithm.digest_len(),
                    bytes.len()
                ),
            }
            .into());
        }

        Ok(match algorithm {
            ChecksumAlgorithm::Md5 => {
                let mut array = [0u8; 16];
                array.copy_from_slice(&bytes);
                Self::Md5(array)
            }
            ChecksumAlgorithm::Sha256 => {
                let mut array = [0u8; 32];
                array.copy_from_slice(&bytes);
                Self::Sha256(array)
            }
        })
    }

    /// The algorithm that produced this digest
    #[must_use]
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        match self {
            Self::Md5(_) => ChecksumAlgorithm::Md5,
            Self::Sha256(_) => ChecksumAlgorithm::Sha256,
        }
    }

    /// Get the raw digest bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Md5(bytes) => bytes,
            Self::Sha256(bytes) => bytes,
        }
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Compute the digest of a byte slice
    #[must_use]
    pub fn of_data(algorithm: ChecksumAlgorithm, data: &[u8]) -> Self {
        let mut hasher = ChecksumHasher::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Compute the digest of a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn hash_file(algorithm: ChecksumAlgorithm, path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|_| StorageError::PathNotFound {
                path: path.display().to_string(),
            })?;

        let mut hasher = ChecksumHasher::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Digest lengths differ, so the algorithm is inferred
        let algorithm = match s.len() {
            32 => ChecksumAlgorithm::Md5,
            64 => ChecksumAlgorithm::Sha256,
            n => {
                return Err(serde::de::Error::custom(format!(
                    "unrecognized digest length {n}"
                )))
            }
        };
        Self::from_hex(algorithm, &s).map_err(serde::de::Error::custom)
    }
}

enum HasherInner {
    Md5(Md5),
    Sha256(Sha256),
}

/// Incremental hasher fed chunk by chunk while a download streams
pub struct ChecksumHasher {
    inner: HasherInner,
}

impl ChecksumHasher {
    #[must_use]
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        let inner = match algorithm {
            ChecksumAlgorithm::Md5 => HasherInner::Md5(Md5::new()),
            ChecksumAlgorithm::Sha256 => HasherInner::Sha256(Sha256::new()),
        };
        Self { inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            HasherInner::Md5(h) => h.update(data),
            HasherInner::Sha256(h) => h.update(data),
        }
    }

    #[must_use]
    pub fn finalize(self) -> Checksum {
        match self.inner {
            HasherInner::Md5(h) => Checksum::Md5(h.finalize().into()),
            HasherInner::Sha256(h) => Checksum::Sha256(h.finalize().into()),
        }
    }
}

/// Verify a file matches an expected checksum
///
/// # Errors
///
/// Returns an error if the file cannot be read or hashed.
pub async fn verify_file(path: &Path, expected: &Checksum) -> Result<bool, Error> {
    let actual = Checksum::hash_file(expected.algorithm(), path).await?;
    Ok(actual == *expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_vectors() {
        let data = b"hello world";

        let md5 = Checksum::of_data(ChecksumAlgorithm::Md5, data);
        assert_eq!(md5.to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");

        let sha256 = Checksum::of_data(ChecksumAlgorithm::Sha256, data);
        assert_eq!(
            sha256.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_from_hex_round_trip() {
        let hex = "5eb63bbbe01eeed093cb22bb8f5acdc3";
        let checksum = Checksum::from_hex(ChecksumAlgorithm::Md5, hex).unwrap();
        assert_eq!(checksum.algorithm(), ChecksumAlgorithm::Md5);
        assert_eq!(checksum.to_hex(), hex);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Checksum::from_hex(ChecksumAlgorithm::Md5, "zz").is_err());
        // Wrong length for the algorithm
        assert!(Checksum::from_hex(
            ChecksumAlgorithm::Sha256,
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        )
        .is_err());
    }

    #[test]
    fn test_serde_infers_algorithm_from_length() {
        let md5: Checksum =
            serde_json::from_str("\"5eb63bbbe01eeed093cb22bb8f5acdc3\"").unwrap();
        assert_eq!(md5.algorithm(), ChecksumAlgorithm::Md5);

        let sha256: Checksum = serde_json::from_str(
            "\"b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9\"",
        )
        .unwrap();
        assert_eq!(sha256.algorithm(), ChecksumAlgorithm::Sha256);

        let json = serde_json::to_string(&sha256).unwrap();
        let back: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sha256);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = ChecksumHasher::new(ChecksumAlgorithm::Sha256);
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(
            hasher.finalize(),
            Checksum::of_data(ChecksumAlgorithm::Sha256, b"hello world")
        );
    }

    #[tokio::test]
    async fn test_hash_file() {
        use std::io::Write;
        let mut temp = NamedTempFile::new().unwrap();
        let data = b"test file content";
        temp.write_all(data).unwrap();

        let hash = Checksum::hash_file(ChecksumAlgorithm::Md5, temp.path())
            .await
            .unwrap();
        assert_eq!(hash, Checksum::of_data(ChecksumAlgorithm::Md5, data));
    }

    #[tokio::test]
    async fn test_verify_file() {
        use std::io::Write;
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"payload").unwrap();

        let good = Checksum::of_data(ChecksumAlgorithm::Sha256, b"payload");
        let bad = Checksum::of_data(ChecksumAlgorithm::Sha256, b"tampered");

        assert!(verify_file(temp.path(), &good).await.unwrap());
        assert!(!verify_file(temp.path(), &bad).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_file_missing_path() {
        let missing = Path::new("/nonexistent/file.conda");
        assert!(Checksum::hash_file(ChecksumAlgorithm::Md5, missing)
            .await
            .is_err());
    }
}
