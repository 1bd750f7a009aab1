//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error {status} from {url}")]
    HttpError { status: u16, url: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("access denied ({status}): {url}")]
    AccessDenied { status: u16, url: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

impl NetworkError {
    /// Whether another attempt at the same transfer can plausibly succeed.
    ///
    /// Timeouts, connection failures, server errors, and corrupted
    /// transfers are transient. Missing or forbidden resources and
    /// malformed URLs are permanent for the current run.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::DownloadFailed(_)
            | Self::ConnectionRefused(_)
            | Self::HttpError { .. }
            | Self::ChecksumMismatch { .. }
            | Self::SizeMismatch { .. } => true,
            Self::InvalidUrl(_) | Self::NotFound { .. } | Self::AccessDenied { .. } => false,
        }
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) => {
                Some("Check network connectivity to the upstream repository and retry.")
            }
            Self::NotFound { .. } => {
                Some("The upstream index may be ahead of its artifacts; re-run the sync later.")
            }
            Self::AccessDenied { .. } => {
                Some("Verify the upstream URL; this mirror does not negotiate credentials.")
            }
            Self::InvalidUrl(_) => Some("Fix the upstream URL in the configuration."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}
