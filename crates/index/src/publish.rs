//! Atomic index publication
//!
//! The index document is the consistency point of the mirror: readers
//! must only ever observe a complete document. Writes go to a sibling
//! temporary file which is renamed over the target, so a crash mid-write
//! leaves the previous index untouched.

use crate::models::RepoData;
use repomirror_errors::{Error, StorageError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filename of the per-subdirectory index document
pub const REPODATA_FILENAME: &str = "repodata.json";

/// Path of the index document within a subdirectory
#[must_use]
pub fn repodata_path(subdir_dir: &Path) -> PathBuf {
    subdir_dir.join(REPODATA_FILENAME)
}

/// Publish an index document atomically.
///
/// Serializes pretty JSON with a trailing newline, writes it to a
/// temporary file in the same directory, then renames it into place.
/// Returns the published path.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the document
/// cannot be serialized, written, or renamed.
pub async fn write_repodata(subdir_dir: &Path, repodata: &RepoData) -> Result<PathBuf, Error> {
    fs::create_dir_all(subdir_dir)
        .await
        .map_err(|e| StorageError::IoError {
            message: format!("failed to create {}: {e}", subdir_dir.display()),
        })?;

    let path = repodata_path(subdir_dir);
    let mut json = repodata.to_json()?;
    json.push('\n');

    // Write to temporary file first
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &json)
        .await
        .map_err(|e| StorageError::IoError {
            message: format!("failed to write {}: {e}", temp_path.display()),
        })?;

    // Atomic rename
    fs::rename(&temp_path, &path)
        .await
        .map_err(|e| StorageError::AtomicRenameFailed {
            message: format!("{} -> {}: {e}", temp_path.display(), path.display()),
        })?;

    Ok(path)
}

/// Read a previously published index document.
///
/// A missing document means the subdirectory has never been published
/// and is reported as `None`, not an error.
///
/// # Errors
///
/// Returns an error if an existing document cannot be read or parsed.
pub async fn read_repodata(subdir_dir: &Path) -> Result<Option<RepoData>, Error> {
    let path = repodata_path(subdir_dir);
    match fs::read_to_string(&path).await {
        Ok(content) => Ok(Some(RepoData::from_json(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let temp = tempdir().unwrap();
        let subdir = temp.path().join("linux-64");

        let json = r#"{"packages": {"x-1.0-0.tar.bz2": {"name": "x", "version": "1.0", "build": "0", "size": 1, "md5": "5eb63bbbe01eeed093cb22bb8f5acdc3"}}}"#;
        let repodata = RepoData::from_json(json).unwrap();

        let path = write_repodata(&subdir, &repodata).await.unwrap();
        assert_eq!(path, subdir.join(REPODATA_FILENAME));

        let loaded = read_repodata(&subdir).await.unwrap().unwrap();
        assert_eq!(loaded.record_count(), 1);

        // No temporary left behind
        assert!(!subdir.join("repodata.tmp").exists());
    }

    #[tokio::test]
    async fn test_written_document_ends_with_newline() {
        let temp = tempdir().unwrap();
        let path = write_repodata(temp.path(), &RepoData::default())
            .await
            .unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_missing_document_reads_as_none() {
        let temp = tempdir().unwrap();
        assert!(read_repodata(temp.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rewrite_replaces_previous_document() {
        let temp = tempdir().unwrap();

        write_repodata(temp.path(), &RepoData::default())
            .await
            .unwrap();

        let json = r#"{"packages.conda": {"y-2.0-0.conda": {"name": "y", "version": "2.0", "build": "0", "size": 2, "md5": "5eb63bbbe01eeed093cb22bb8f5acdc3"}}}"#;
        let updated = RepoData::from_json(json).unwrap();
        write_repodata(temp.path(), &updated).await.unwrap();

        let loaded = read_repodata(temp.path()).await.unwrap().unwrap();
        assert_eq!(loaded.record_count(), 1);
        assert!(loaded.get("y-2.0-0.conda").is_some());
    }
}
