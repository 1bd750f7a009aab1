//! Repository index error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum IndexError {
    #[error("invalid index: {message}")]
    InvalidFormat { message: String },

    #[error("index record {filename} is missing required field {field}")]
    MissingField { field: String, filename: String },

    #[error("failed to serialize index: {message}")]
    SerializeFailed { message: String },
}

impl UserFacingError for IndexError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFormat { .. } | Self::MissingField { .. } => {
                Some("The upstream served an unusable index document; nothing was modified locally.")
            }
            Self::SerializeFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }
}
