//! Removal of local artifacts the index no longer lists

use repomirror_events::{Event, EventEmitter, EventSender};
use std::path::Path;

/// Delete each listed file from the mirror directory.
///
/// Best effort: a failed unlink is reported and counted, never fatal.
/// Returns `(pruned, failures)`.
pub(crate) async fn prune_extraneous(
    dir: &Path,
    to_remove: &[String],
    tx: &EventSender,
) -> (usize, usize) {
    let mut pruned = 0usize;
    let mut failures = 0usize;

    for filename in to_remove {
        match tokio::fs::remove_file(dir.join(filename)).await {
            Ok(()) => {
                pruned += 1;
                tx.emit(Event::ArtifactPruned {
                    filename: filename.clone(),
                });
            }
            Err(e) => {
                failures += 1;
                tx.emit(Event::PruneFailed {
                    filename: filename.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (pruned, failures)
}
