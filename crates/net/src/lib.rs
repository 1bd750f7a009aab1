#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for repomirror
//!
//! This crate provides HTTP access to upstream channels: a configured
//! client, single-shot text fetching for indexes, and an artifact
//! downloader with retry, digest validation, and atomic promotion.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{
    calculate_backoff_delay, ArtifactDownloader, ArtifactRequest, DownloadFailure, RetryConfig,
};

use download::validation;
use repomirror_errors::{Error, NetworkError};
use repomirror_events::{EventEmitter, EventSender};

/// Fetch text content from a URL in a single attempt.
///
/// Index fetches are not retried: a channel whose index cannot be read
/// leaves nothing sensible to sync, so the failure surfaces directly.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the request fails, or the
/// server responds with a non-success status.
pub async fn fetch_text(client: &NetClient, url: &str, tx: &EventSender) -> Result<String, Error> {
    validation::validate_url(url)?;
    tx.emit_debug(format!("Fetching text from {url}"));

    let response = client.get(url).await?;
    let response = validation::check_status(response, url)?;

    response
        .text()
        .await
        .map_err(|e| NetworkError::DownloadFailed(format!("failed to read body of {url}: {e}")).into())
}

/// Parse and validate a URL without issuing a request.
///
/// # Errors
///
/// Returns an error if the URL is malformed or uses an unsupported
/// scheme.
pub fn parse_url(url: &str) -> Result<url::Url, Error> {
    validation::validate_url(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_valid() {
        let url = parse_url("https://conda.anaconda.org/conda-forge/noarch/repodata.json");
        assert!(url.is_ok());
        assert_eq!(url.unwrap().host_str(), Some("conda.anaconda.org"));
    }

    #[test]
    fn test_parse_url_invalid() {
        assert!(parse_url("://missing-scheme").is_err());
        assert!(parse_url("ftp://example.com/repodata.json").is_err());
    }
}
