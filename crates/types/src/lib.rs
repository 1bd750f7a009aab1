#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the repomirror sync engine
//!
//! This crate provides fundamental types used throughout the system,
//! including upstream channel locations, loose version ordering,
//! record filters, and run reports.

pub mod channel;
pub mod pattern;
pub mod reports;
pub mod version;

// Re-export commonly used types
pub use channel::{Channel, DEFAULT_CHANNEL_HOST};
pub use pattern::{FilterSet, PackagePattern, PatternSpec, RecordFields};
pub use reports::{SubdirSummary, SyncReport};
pub use version::PackageVersion;

/// Filename extensions that mark a file as a mirrored artifact
pub const ARTIFACT_EXTENSIONS: [&str; 2] = [".tar.bz2", ".conda"];

/// Suffix used for in-flight download temporaries
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Check whether a filename names a package artifact
#[must_use]
pub fn is_artifact_filename(name: &str) -> bool {
    ARTIFACT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_filename() {
        assert!(is_artifact_filename("zlib-1.2.13-h166bdaf_4.tar.bz2"));
        assert!(is_artifact_filename("zstd-1.5.2-ha95c52a_0.conda"));
        assert!(!is_artifact_filename("repodata.json"));
        assert!(!is_artifact_filename("zlib-1.2.13-h166bdaf_4.tar.bz2.partial"));
    }
}
