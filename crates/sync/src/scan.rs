//! Local mirror directory scanning

use repomirror_errors::Error;
use repomirror_types::{is_artifact_filename, PARTIAL_SUFFIX};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What a subdirectory of the mirror physically contains
#[derive(Clone, Debug, Default)]
pub struct LocalMirrorState {
    /// Artifact filename to observed size
    pub files: BTreeMap<String, u64>,
    /// Leftover download temporaries from earlier interrupted runs
    pub stale_temps: Vec<PathBuf>,
}

impl LocalMirrorState {
    /// Whether the mirror directory holds no artifacts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Enumerate the artifacts present in one mirror subdirectory.
///
/// A missing directory is an empty mirror, not an error. Non-artifact
/// entries (the index file, subdirectories, unrelated files) are
/// ignored; `.partial` leftovers are collected for cleanup.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub async fn scan_dir(dir: &Path) -> Result<LocalMirrorState, Error> {
    let mut state = LocalMirrorState::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(state),
        Err(e) => return Err(Error::io_with_path(&e, dir)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, dir))?
    {
        let metadata = entry
            .metadata()
            .await
            .map_err(|e| Error::io_with_path(&e, entry.path()))?;
        if !metadata.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };

        if is_artifact_filename(&name) {
            state.files.insert(name, metadata.len());
        } else if name.ends_with(PARTIAL_SUFFIX) {
            state.stale_temps.push(entry.path());
        }
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = scan_dir(&dir.path().join("linux-64")).await.unwrap();
        assert!(state.is_empty());
        assert!(state.stale_temps.is_empty());
    }

    #[tokio::test]
    async fn test_scan_collects_artifacts_and_temps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zlib-1.2.13-h0_4.tar.bz2"), b"aaaa").unwrap();
        std::fs::write(dir.path().join("zstd-1.5.5-h0_0.conda"), b"bbbbbb").unwrap();
        std::fs::write(dir.path().join("numpy-1.26-py_0.conda.partial"), b"cc").unwrap();
        std::fs::write(dir.path().join("repodata.json"), b"{}").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let state = scan_dir(dir.path()).await.unwrap();

        assert_eq!(state.files.len(), 2);
        assert_eq!(state.files["zlib-1.2.13-h0_4.tar.bz2"], 4);
        assert_eq!(state.files["zstd-1.5.5-h0_0.conda"], 6);
        assert_eq!(state.stale_temps.len(), 1);
        assert!(state.stale_temps[0].ends_with("numpy-1.26-py_0.conda.partial"));
    }
}
