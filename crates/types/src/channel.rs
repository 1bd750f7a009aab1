//! Upstream channel locations
//!
//! An upstream is given either as a bare channel name (`conda-forge`),
//! resolved against the default hosting service, or as a full URL whose
//! last path segment is the channel name
//! (`https://repo.example.com/private-channel`).

use repomirror_errors::{Error, NetworkError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host used to resolve bare channel names
pub const DEFAULT_CHANNEL_HOST: &str = "https://conda.anaconda.org";

/// A resolved upstream channel location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    base: String,
    name: String,
}

impl Channel {
    /// Resolve an upstream string into a channel location.
    ///
    /// Trailing slashes are ignored. A string without a URL scheme is
    /// treated as a channel name on the default host.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream string is empty or a URL with no
    /// channel path.
    pub fn parse(upstream: &str) -> Result<Self, Error> {
        let trimmed = upstream.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(NetworkError::InvalidUrl("empty upstream channel".to_string()).into());
        }

        if trimmed.contains("://") {
            let (base, name) = trimmed.rsplit_once('/').ok_or_else(|| {
                NetworkError::InvalidUrl(format!("no channel path in {trimmed}"))
            })?;
            if name.is_empty() || base.ends_with(':') || base.ends_with('/') {
                return Err(
                    NetworkError::InvalidUrl(format!("no channel path in {trimmed}")).into(),
                );
            }
            Ok(Self {
                base: base.to_string(),
                name: name.to_string(),
            })
        } else {
            Ok(Self {
                base: DEFAULT_CHANNEL_HOST.to_string(),
                name: trimmed.to_string(),
            })
        }
    }

    /// Channel name (last path segment)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL the channel lives under
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full channel URL
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/{}", self.base, self.name)
    }

    /// URL of the index document for a platform subdirectory
    #[must_use]
    pub fn repodata_url(&self, subdir: &str) -> String {
        format!("{}/{}/{}/repodata.json", self.base, self.name, subdir)
    }

    /// URL of an artifact within a platform subdirectory
    #[must_use]
    pub fn artifact_url(&self, subdir: &str, filename: &str) -> String {
        format!("{}/{}/{}/{}", self.base, self.name, subdir, filename)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}
