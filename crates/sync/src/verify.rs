//! Re-verification of artifacts already on disk

use crate::scan::LocalMirrorState;
use futures::stream::{self, StreamExt};
use repomirror_errors::Error;
use repomirror_events::{Event, EventEmitter, EventSender};
use repomirror_hash::Checksum;
use repomirror_index::PackageRecord;
use std::collections::BTreeMap;
use std::path::Path;

/// Re-hash artifacts the plan would keep and delete any that no longer
/// match their index digest. Deleted files drop out of the local state
/// so the diff schedules them for re-download.
///
/// Returns the number of corrupt artifacts removed.
pub(crate) async fn verify_existing(
    dir: &Path,
    effective: &BTreeMap<&str, &PackageRecord>,
    local: &mut LocalMirrorState,
    concurrency: usize,
    subdir: &str,
    tx: &EventSender,
) -> Result<usize, Error> {
    // Size-mismatched files get re-downloaded anyway; only re-hash
    // files the diff would otherwise keep.
    let mut candidates: Vec<(String, Checksum)> = Vec::new();
    for (filename, record) in effective {
        if local.files.get(*filename).copied() == Some(record.expected_size()) {
            candidates.push(((*filename).to_string(), record.checksum()?));
        }
    }

    if candidates.is_empty() {
        return Ok(0);
    }

    tx.emit(Event::VerifyStarted {
        subdir: subdir.to_string(),
        files: candidates.len(),
    });

    let results = stream::iter(candidates.into_iter().map(|(filename, expected)| {
        let path = dir.join(&filename);
        async move {
            // An unreadable artifact is as good as corrupt.
            let ok = repomirror_hash::verify_file(&path, &expected)
                .await
                .unwrap_or(false);
            (filename, path, ok)
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut removed = 0usize;
    for (filename, path, ok) in results {
        if ok {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                local.files.remove(&filename);
                removed += 1;
                tx.emit(Event::CorruptRemoved { filename });
            }
            Err(e) => {
                tx.emit(Event::warning_with_context(
                    format!("could not remove corrupt artifact {filename}"),
                    e.to_string(),
                ));
            }
        }
    }

    Ok(removed)
}
