//! Glob-based record filters
//!
//! A pattern selects index records by matching shell-style globs
//! against record fields, case-insensitively. Every field given in a
//! pattern must match. A filter set combines a blacklist with a
//! whitelist that rescues records back out of the blacklist.

use glob::Pattern;
use repomirror_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};

/// Raw, deserializable form of a record pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// The record fields a pattern can match against
#[derive(Debug, Clone, Copy)]
pub struct RecordFields<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub build: &'a str,
    pub license: Option<&'a str>,
}

/// A compiled record pattern
#[derive(Debug, Clone)]
pub struct PackagePattern {
    name: Option<Pattern>,
    version: Option<Pattern>,
    build: Option<Pattern>,
    license: Option<Pattern>,
}

fn compile_field(field: &str, value: Option<&str>) -> Result<Option<Pattern>, Error> {
    value
        .map(|v| {
            Pattern::new(&v.to_lowercase()).map_err(|e| {
                ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{v}: {e}"),
                }
                .into()
            })
        })
        .transpose()
}

fn field_matches(pattern: Option<&Pattern>, value: Option<&str>) -> bool {
    match pattern {
        None => true,
        // An absent record field matches only an empty-string glob
        Some(p) => p.matches(&value.unwrap_or("").to_lowercase()),
    }
}

impl PackagePattern {
    /// Compile a raw pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if any field holds an invalid glob.
    pub fn compile(spec: &PatternSpec) -> Result<Self, Error> {
        Ok(Self {
            name: compile_field("name", spec.name.as_deref())?,
            version: compile_field("version", spec.version.as_deref())?,
            build: compile_field("build", spec.build.as_deref())?,
            license: compile_field("license", spec.license.as_deref())?,
        })
    }

    /// Whether this pattern selects the record
    #[must_use]
    pub fn matches(&self, fields: &RecordFields<'_>) -> bool {
        field_matches(self.name.as_ref(), Some(fields.name))
            && field_matches(self.version.as_ref(), Some(fields.version))
            && field_matches(self.build.as_ref(), Some(fields.build))
            && field_matches(self.license.as_ref(), fields.license)
    }
}

/// Blacklist/whitelist pair applied to the remote index
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    blacklist: Vec<PackagePattern>,
    whitelist: Vec<PackagePattern>,
}

impl FilterSet {
    /// Compile raw blacklist and whitelist patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern holds an invalid glob.
    pub fn compile(blacklist: &[PatternSpec], whitelist: &[PatternSpec]) -> Result<Self, Error> {
        Ok(Self {
            blacklist: blacklist
                .iter()
                .map(PackagePattern::compile)
                .collect::<Result<_, _>>()?,
            whitelist: whitelist
                .iter()
                .map(PackagePattern::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Whether no patterns are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blacklist.is_empty() && self.whitelist.is_empty()
    }

    /// A record is excluded when a blacklist pattern selects it and no
    /// whitelist pattern rescues it.
    #[must_use]
    pub fn excludes(&self, fields: &RecordFields<'_>) -> bool {
        self.blacklist.iter().any(|p| p.matches(fields))
            && !self.whitelist.iter().any(|p| p.matches(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(name: &'a str, version: &'a str, license: Option<&'a str>) -> RecordFields<'a> {
        RecordFields {
            name,
            version,
            build: "0",
            license,
        }
    }

    fn spec(name: Option<&str>, license: Option<&str>) -> PatternSpec {
        PatternSpec {
            name: name.map(String::from),
            license: license.map(String::from),
            ..PatternSpec::default()
        }
    }

    #[test]
    fn test_name_glob_is_case_insensitive() {
        let pattern = PackagePattern::compile(&spec(Some("NumPy*"), None)).unwrap();
        assert!(pattern.matches(&fields("numpy-base", "1.21.0", None)));
        assert!(!pattern.matches(&fields("scipy", "1.7.0", None)));
    }

    #[test]
    fn test_all_given_fields_must_match() {
        let pattern = PackagePattern::compile(&PatternSpec {
            name: Some("numpy".to_string()),
            version: Some("1.*".to_string()),
            ..PatternSpec::default()
        })
        .unwrap();
        assert!(pattern.matches(&fields("numpy", "1.21.0", None)));
        assert!(!pattern.matches(&fields("numpy", "2.0.0", None)));
    }

    #[test]
    fn test_missing_license_field() {
        let pattern = PackagePattern::compile(&spec(None, Some("*agpl*"))).unwrap();
        assert!(pattern.matches(&fields("x", "1", Some("AGPL-3.0"))));
        assert!(!pattern.matches(&fields("x", "1", None)));
    }

    #[test]
    fn test_whitelist_rescues_from_blacklist() {
        let filters = FilterSet::compile(
            &[spec(Some("*"), None)],
            &[spec(Some("numpy"), None)],
        )
        .unwrap();
        assert!(filters.excludes(&fields("scipy", "1.7.0", None)));
        assert!(!filters.excludes(&fields("numpy", "1.21.0", None)));
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let filters = FilterSet::default();
        assert!(filters.is_empty());
        assert!(!filters.excludes(&fields("anything", "1", None)));
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        assert!(PackagePattern::compile(&spec(Some("[unclosed"), None)).is_err());
    }
}
