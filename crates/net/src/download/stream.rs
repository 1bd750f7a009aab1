//! Chunked streaming of response bodies to disk

use futures::StreamExt;
use repomirror_errors::{Error, NetworkError};
use repomirror_events::{Event, EventEmitter, EventSender};
use repomirror_hash::{Checksum, ChecksumAlgorithm, ChecksumHasher};
use reqwest::Response;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Minimum interval between progress events per transfer
const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Per-transfer state shared with the streaming loop
pub(crate) struct StreamContext<'a> {
    pub filename: &'a str,
    pub url: &'a str,
    pub total_size: Option<u64>,
    pub chunk_timeout: Duration,
    pub tx: &'a EventSender,
}

/// Stream the response body to `dest`, hashing as bytes arrive.
///
/// Returns the byte count and the computed digest. The digest is `None`
/// when no algorithm was requested. The caller owns cleanup of `dest`
/// on failure.
pub(crate) async fn stream_to_file(
    response: Response,
    dest: &Path,
    algorithm: Option<ChecksumAlgorithm>,
    ctx: &StreamContext<'_>,
) -> Result<(u64, Option<Checksum>), Error> {
    let mut file = File::create(dest)
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;

    let mut hasher = algorithm.map(ChecksumHasher::new);
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded = 0u64;
    let mut last_progress = Instant::now();

    loop {
        // A stalled connection should not hang the worker for the full
        // request timeout; give up if no chunk arrives in time.
        let next = tokio::time::timeout(ctx.chunk_timeout, stream.next()).await;
        let chunk = match next {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => {
                return Err(NetworkError::DownloadFailed(format!(
                    "stream interrupted for {}: {e}",
                    ctx.filename
                ))
                .into());
            }
            Ok(None) => break,
            Err(_) => {
                return Err(NetworkError::Timeout {
                    url: ctx.url.to_string(),
                }
                .into());
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;

        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&chunk);
        }
        bytes_downloaded += chunk.len() as u64;

        if last_progress.elapsed() >= PROGRESS_INTERVAL {
            ctx.tx.emit(Event::DownloadProgress {
                filename: ctx.filename.to_string(),
                bytes_downloaded,
                total_bytes: ctx.total_size,
            });
            last_progress = Instant::now();
        }
    }

    file.flush()
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;

    ctx.tx.emit(Event::DownloadProgress {
        filename: ctx.filename.to_string(),
        bytes_downloaded,
        total_bytes: ctx.total_size,
    });

    Ok((bytes_downloaded, hasher.map(ChecksumHasher::finalize)))
}
