//! Index data models

use repomirror_errors::{Error, IndexError};
use repomirror_hash::{Checksum, ChecksumAlgorithm};
use repomirror_types::{is_artifact_filename, RecordFields};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// One artifact entry in a repository index
///
/// Unknown upstream fields are carried in `extra` so a republished
/// record is byte-equivalent to what the upstream served.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build: String,
    #[serde(default)]
    pub build_number: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PackageRecord {
    /// Size the index promises for the artifact. Valid records always
    /// carry one; `validate` rejects those that do not.
    #[must_use]
    pub fn expected_size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    /// Strongest digest the record carries. SHA-256 wins when a record
    /// offers both.
    ///
    /// # Errors
    ///
    /// Returns an error if the record carries no digest or the hex
    /// string is malformed.
    pub fn checksum(&self) -> Result<Checksum, Error> {
        if let Some(hex) = &self.sha256 {
            return Checksum::from_hex(ChecksumAlgorithm::Sha256, hex);
        }
        if let Some(hex) = &self.md5 {
            return Checksum::from_hex(ChecksumAlgorithm::Md5, hex);
        }
        Err(IndexError::MissingField {
            field: "md5/sha256".to_string(),
            filename: format!("{}-{}-{}", self.name, self.version, self.build),
        }
        .into())
    }

    /// Fields exposed to blacklist/whitelist patterns
    #[must_use]
    pub fn filter_fields(&self) -> RecordFields<'_> {
        RecordFields {
            name: &self.name,
            version: &self.version,
            build: &self.build,
            license: self.license.as_deref(),
        }
    }
}

/// A platform subdirectory's index document
///
/// Legacy artifacts live under `packages`, v2 artifacts under
/// `packages.conda`. Decision logic treats the union as one map keyed
/// by filename; `BTreeMap` keys keep serialization deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoData {
    #[serde(default)]
    pub info: BTreeMap<String, Value>,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageRecord>,
    #[serde(default, rename = "packages.conda")]
    pub conda_packages: BTreeMap<String, PackageRecord>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RepoData {
    /// Parse an index document from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| {
            IndexError::InvalidFormat {
                message: format!("invalid index JSON: {e}"),
            }
            .into()
        })
    }

    /// Serialize the document to pretty JSON. Keys are sorted by
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| {
            IndexError::SerializeFailed {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Iterate all records, legacy and v2, keyed by filename
    pub fn records(&self) -> impl Iterator<Item = (&String, &PackageRecord)> {
        self.packages.iter().chain(self.conda_packages.iter())
    }

    /// Total record count across both maps
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.packages.len() + self.conda_packages.len()
    }

    /// Whether the document lists no artifacts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.conda_packages.is_empty()
    }

    /// Look up a record by filename in either map
    #[must_use]
    pub fn get(&self, filename: &str) -> Option<&PackageRecord> {
        self.packages
            .get(filename)
            .or_else(|| self.conda_packages.get(filename))
    }

    /// Fill in the platform for records the upstream left without one
    pub fn default_subdir(&mut self, subdir: &str) {
        for record in self
            .packages
            .values_mut()
            .chain(self.conda_packages.values_mut())
        {
            if record.subdir.is_none() {
                record.subdir = Some(subdir.to_string());
            }
        }
    }

    /// Validate index format
    ///
    /// # Errors
    ///
    /// Returns an error if a filename does not look like an artifact,
    /// a record is missing name/version/build/size, or a record carries
    /// no parseable digest.
    pub fn validate(&self) -> Result<(), Error> {
        for (filename, record) in self.records() {
            if !is_artifact_filename(filename) {
                return Err(IndexError::InvalidFormat {
                    message: format!("unrecognized artifact filename: {filename}"),
                }
                .into());
            }

            for (field, present) in [
                ("name", !record.name.is_empty()),
                ("version", !record.version.is_empty()),
                ("build", !record.build.is_empty()),
                ("size", record.size.is_some()),
            ] {
                if !present {
                    return Err(IndexError::MissingField {
                        field: field.to_string(),
                        filename: filename.clone(),
                    }
                    .into());
                }
            }

            if record.md5.is_none() && record.sha256.is_none() {
                return Err(IndexError::MissingField {
                    field: "md5/sha256".to_string(),
                    filename: filename.clone(),
                }
                .into());
            }
            record.checksum().map_err(|_| IndexError::InvalidFormat {
                message: format!("malformed digest on {filename}"),
            })?;
        }
        Ok(())
    }

    /// Build the document restricted to the given filenames, preserving
    /// `info` and unknown top-level fields
    #[must_use]
    pub fn restrict_to(&self, keep: &BTreeSet<String>) -> Self {
        Self {
            info: self.info.clone(),
            packages: self
                .packages
                .iter()
                .filter(|(filename, _)| keep.contains(*filename))
                .map(|(filename, record)| (filename.clone(), record.clone()))
                .collect(),
            conda_packages: self
                .conda_packages
                .iter()
                .filter(|(filename, _)| keep.contains(*filename))
                .map(|(filename, record)| (filename.clone(), record.clone()))
                .collect(),
            extra: self.extra.clone(),
        }
    }
}
