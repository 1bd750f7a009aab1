//! Pure diff of the effective remote view against local state

use crate::scan::LocalMirrorState;
use repomirror_index::PackageRecord;
use std::collections::BTreeMap;

/// What one subdirectory sync run intends to do
#[derive(Clone, Debug, Default)]
pub struct SyncPlan {
    /// Filenames to fetch, ordered by filename
    pub to_download: Vec<String>,
    /// Local filenames to delete, ordered by filename
    pub to_remove: Vec<String>,
    /// Filenames already present with the expected size
    pub present: Vec<String>,
    /// Total bytes the downloads will transfer
    pub download_bytes: u64,
}

impl SyncPlan {
    /// Whether the mirror already matches the effective view
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_download.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff the effective remote view against the local scan.
///
/// An artifact is downloaded when it is absent locally or its local
/// size disagrees with the index; a local file is removed when the
/// effective view no longer lists it. The two sets are disjoint by
/// construction. `max_packages` truncates the ordered download list;
/// truncated entries are treated as absent for this run.
#[must_use]
pub fn compute(
    effective: &BTreeMap<&str, &PackageRecord>,
    local: &LocalMirrorState,
    max_packages: Option<usize>,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for (filename, record) in effective {
        match local.files.get(*filename) {
            Some(size) if *size == record.expected_size() => {
                plan.present.push((*filename).to_string());
            }
            _ => plan.to_download.push((*filename).to_string()),
        }
    }

    if let Some(limit) = max_packages {
        plan.to_download.truncate(limit);
    }

    plan.download_bytes = plan
        .to_download
        .iter()
        .filter_map(|f| effective.get(f.as_str()))
        .map(|r| r.expected_size())
        .sum();

    plan.to_remove = local
        .files
        .keys()
        .filter(|f| !effective.contains_key(f.as_str()))
        .cloned()
        .collect();

    plan
}
