//! Report type definitions for sync runs

use serde::{Deserialize, Serialize};

/// Outcome of synchronizing one platform subdirectory
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubdirSummary {
    /// Platform subdirectory name
    pub subdir: String,
    /// Records in the fetched remote index
    pub remote_records: usize,
    /// Records removed from consideration by filters
    pub excluded: usize,
    /// Artifacts fetched and promoted this run
    pub downloaded: usize,
    /// Bytes fetched for promoted artifacts
    pub downloaded_bytes: u64,
    /// Artifacts already present and kept
    pub already_present: usize,
    /// Artifacts that permanently failed this run
    pub failed: usize,
    /// Local files removed because the index no longer lists them
    pub pruned: usize,
    /// Prune deletions that failed
    pub prune_failures: usize,
    /// Existing files removed after failing re-verification
    pub corrupt_removed: usize,
    /// Whether an index was published for this subdirectory
    pub published: bool,
    /// Wall-clock time for this subdirectory
    pub duration_ms: u64,
}

/// Aggregated outcome of a full sync run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Per-subdirectory outcomes, in the order they were synced
    pub subdirs: Vec<SubdirSummary>,
    /// Wall-clock time for the whole run
    pub duration_ms: u64,
}

impl SyncReport {
    /// Total artifacts downloaded across subdirectories
    #[must_use]
    pub fn total_downloaded(&self) -> usize {
        self.subdirs.iter().map(|s| s.downloaded).sum()
    }

    /// Total bytes downloaded across subdirectories
    #[must_use]
    pub fn total_downloaded_bytes(&self) -> u64 {
        self.subdirs.iter().map(|s| s.downloaded_bytes).sum()
    }

    /// Total permanent artifact failures across subdirectories
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.subdirs.iter().map(|s| s.failed).sum()
    }

    /// Whether the run completed without artifact or prune failures
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.subdirs
            .iter()
            .all(|s| s.failed == 0 && s.prune_failures == 0)
    }
}
