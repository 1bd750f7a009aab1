//! Artifact download with retry, validation, and atomic promotion

pub(crate) mod retry;
pub(crate) mod stream;
pub(crate) mod validation;

pub use retry::{calculate_backoff_delay, RetryConfig};

use crate::client::NetClient;
use repomirror_errors::{Error, NetworkError, StorageError};
use repomirror_events::{Event, EventEmitter, EventSender};
use repomirror_hash::Checksum;
use repomirror_types::PARTIAL_SUFFIX;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stream::{stream_to_file, StreamContext};

/// Default ceiling on the gap between two chunks of one response
const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// One artifact to fetch, as described by the upstream index
#[derive(Clone, Debug)]
pub struct ArtifactRequest {
    /// Artifact filename, also the basename of the destination
    pub filename: String,
    /// Fully qualified download URL
    pub url: String,
    /// Size the index promises for this artifact
    pub expected_size: u64,
    /// Digest to verify against, `None` to skip verification
    pub checksum: Option<Checksum>,
}

/// Terminal failure of one artifact after the retry loop
#[derive(Debug)]
pub struct DownloadFailure {
    /// The last error observed; retains transient/permanent classification
    pub error: Error,
    /// Attempts made before giving up
    pub attempts: u32,
}

/// Downloads artifacts with retry on transient failures.
///
/// Each artifact is streamed to a sibling temp file, validated against
/// the index metadata, and renamed into place only when it checks out.
/// A failed or abandoned attempt never leaves a valid-looking file at
/// the final path.
#[derive(Clone, Debug)]
pub struct ArtifactDownloader {
    client: NetClient,
    retry: RetryConfig,
    chunk_timeout: Duration,
}

impl ArtifactDownloader {
    #[must_use]
    pub fn new(client: NetClient, retry: RetryConfig) -> Self {
        Self {
            client,
            retry,
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
        }
    }

    /// Override the chunk timeout used to detect stalled transfers.
    #[must_use]
    pub fn with_chunk_timeout(mut self, chunk_timeout: Duration) -> Self {
        self.chunk_timeout = chunk_timeout;
        self
    }

    /// Download one artifact to `dest`, retrying transient failures.
    ///
    /// Returns the number of bytes written. Permanent failures and
    /// exhausted retries surface the last error together with the
    /// attempt count; in either case no file exists at `dest`
    /// afterwards unless one was already there.
    ///
    /// # Errors
    ///
    /// Returns a failure if the URL is invalid, the server rejects the
    /// request, or the payload fails size or digest validation on
    /// every attempt.
    pub async fn download(
        &self,
        request: &ArtifactRequest,
        dest: &Path,
        tx: &EventSender,
    ) -> Result<u64, DownloadFailure> {
        if let Err(error) = validation::validate_url(&request.url) {
            return Err(DownloadFailure { error, attempts: 0 });
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt(request, dest, tx).await {
                Ok(size) => return Ok(size),
                Err(error) => {
                    if !is_transient(&error) || attempt >= self.retry.max_attempts {
                        return Err(DownloadFailure {
                            error,
                            attempts: attempt,
                        });
                    }
                    let delay = calculate_backoff_delay(&self.retry, attempt);
                    tx.emit(Event::DownloadRetrying {
                        filename: request.filename.clone(),
                        attempt,
                        max_attempts: self.retry.max_attempts,
                        delay,
                        error: error.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: &ArtifactRequest,
        dest: &Path,
        tx: &EventSender,
    ) -> Result<u64, Error> {
        let response = self.client.get(&request.url).await?;
        let response = validation::check_status(response, &request.url)?;

        let total_size = response.content_length().or(Some(request.expected_size));
        tx.emit(Event::DownloadStarted {
            filename: request.filename.clone(),
            url: request.url.clone(),
            total_size,
        });

        let temp_path = partial_path(dest);
        let guard = TempGuard::new(temp_path.clone());

        let context = StreamContext {
            filename: &request.filename,
            url: &request.url,
            total_size,
            chunk_timeout: self.chunk_timeout,
            tx,
        };
        let algorithm = request.checksum.as_ref().map(Checksum::algorithm);
        let (bytes_downloaded, actual) =
            stream_to_file(response, &temp_path, algorithm, &context).await?;

        // The index is authoritative for size even when digest checks
        // are disabled.
        if bytes_downloaded != request.expected_size {
            return Err(NetworkError::SizeMismatch {
                expected: request.expected_size,
                actual: bytes_downloaded,
            }
            .into());
        }

        if let (Some(expected), Some(actual)) = (&request.checksum, &actual) {
            if expected != actual {
                return Err(NetworkError::ChecksumMismatch {
                    expected: expected.to_hex(),
                    actual: actual.to_hex(),
                }
                .into());
            }
        }

        tokio::fs::rename(&temp_path, dest).await.map_err(|e| {
            StorageError::AtomicRenameFailed {
                message: format!(
                    "{} -> {}: {e}",
                    temp_path.display(),
                    dest.display()
                ),
            }
        })?;
        guard.disarm();

        tx.emit(Event::DownloadCompleted {
            filename: request.filename.clone(),
            size: bytes_downloaded,
        });

        Ok(bytes_downloaded)
    }
}

/// Whether another attempt at the same transfer could succeed
fn is_transient(error: &Error) -> bool {
    match error {
        Error::Network(e) => e.is_transient(),
        _ => false,
    }
}

/// Sibling temp path for an in-flight download
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Removes the temp file on drop unless the download was promoted.
/// Dropping mid-flight (cancellation) takes the same path.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
