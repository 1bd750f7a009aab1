//! Reduction of the remote index to the effective view

use repomirror_index::{PackageRecord, RepoData};
use repomirror_types::{FilterSet, PackageVersion};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// The subset of remote records the mirror should actually carry
pub struct EffectiveView<'a> {
    /// Surviving records keyed by filename
    pub records: BTreeMap<&'a str, &'a PackageRecord>,
    /// Records dropped by filters or version selection
    pub excluded: usize,
}

impl EffectiveView<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Apply blacklist/whitelist filters and optional version selection.
///
/// The blacklist excludes, the whitelist rescues from the blacklist.
/// With `latest_only`, only records carrying the highest version per
/// package name survive (ties broken by build number); artifacts
/// sharing that winning version and build number all survive.
#[must_use]
pub fn effective_view<'a>(
    index: &'a RepoData,
    filters: &FilterSet,
    latest_only: bool,
) -> EffectiveView<'a> {
    let mut records: BTreeMap<&str, &PackageRecord> = BTreeMap::new();

    for (filename, record) in index.records() {
        if filters.excludes(&record.filter_fields()) {
            continue;
        }
        records.insert(filename.as_str(), record);
    }

    if latest_only {
        let mut newest: BTreeMap<&str, (PackageVersion, u64)> = BTreeMap::new();
        for record in records.values() {
            let key = (PackageVersion::parse(&record.version), record.build_number);
            match newest.entry(record.name.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(key);
                }
                Entry::Occupied(mut slot) => {
                    if key > *slot.get() {
                        slot.insert(key);
                    }
                }
            }
        }

        records.retain(|_, record| {
            newest
                .get(record.name.as_str())
                .is_some_and(|(version, build_number)| {
                    record.build_number == *build_number
                        && PackageVersion::parse(&record.version) == *version
                })
        });
    }

    let excluded = index.record_count() - records.len();
    EffectiveView { records, excluded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repomirror_types::PatternSpec;

    fn sample_index() -> RepoData {
        RepoData::from_json(
            r#"{
                "info": {"subdir": "linux-64"},
                "packages": {
                    "olddb-8.0-h0_0.tar.bz2": {
                        "name": "olddb", "version": "8.0", "build": "h0_0",
                        "build_number": 0, "size": 10, "license": "AGPL-3.0",
                        "md5": "00000000000000000000000000000000"
                    }
                },
                "packages.conda": {
                    "numpy-1.25.0-py_0.conda": {
                        "name": "numpy", "version": "1.25.0", "build": "py_0",
                        "build_number": 0, "size": 20, "license": "BSD-3-Clause",
                        "md5": "00000000000000000000000000000000"
                    },
                    "numpy-1.26.2-py_0.conda": {
                        "name": "numpy", "version": "1.26.2", "build": "py_0",
                        "build_number": 0, "size": 30, "license": "BSD-3-Clause",
                        "md5": "00000000000000000000000000000000"
                    },
                    "numpy-1.26.2-py_1.conda": {
                        "name": "numpy", "version": "1.26.2", "build": "py_1",
                        "build_number": 1, "size": 31, "license": "BSD-3-Clause",
                        "md5": "00000000000000000000000000000000"
                    }
                }
            }"#,
        )
        .unwrap()
    }

    fn compile(blacklist: &[PatternSpec], whitelist: &[PatternSpec]) -> FilterSet {
        FilterSet::compile(blacklist, whitelist).unwrap()
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let index = sample_index();
        let view = effective_view(&index, &compile(&[], &[]), false);
        assert_eq!(view.len(), 4);
        assert_eq!(view.excluded, 0);
    }

    #[test]
    fn test_blacklist_excludes_by_license() {
        let index = sample_index();
        let blacklist = vec![PatternSpec {
            license: Some("*agpl*".to_string()),
            ..PatternSpec::default()
        }];
        let view = effective_view(&index, &compile(&blacklist, &[]), false);
        assert_eq!(view.len(), 3);
        assert_eq!(view.excluded, 1);
        assert!(!view.records.contains_key("olddb-8.0-h0_0.tar.bz2"));
    }

    #[test]
    fn test_whitelist_rescues_from_blacklist() {
        let index = sample_index();
        let blacklist = vec![PatternSpec {
            name: Some("*".to_string()),
            ..PatternSpec::default()
        }];
        let whitelist = vec![PatternSpec {
            name: Some("numpy".to_string()),
            ..PatternSpec::default()
        }];
        let view = effective_view(&index, &compile(&blacklist, &whitelist), false);
        assert_eq!(view.len(), 3);
        assert!(view.records.keys().all(|f| f.starts_with("numpy")));
    }

    #[test]
    fn test_latest_only_keeps_highest_version_and_build() {
        let index = sample_index();
        let view = effective_view(&index, &compile(&[], &[]), true);
        assert!(view.records.contains_key("numpy-1.26.2-py_1.conda"));
        assert!(!view.records.contains_key("numpy-1.26.2-py_0.conda"));
        assert!(!view.records.contains_key("numpy-1.25.0-py_0.conda"));
        assert!(view.records.contains_key("olddb-8.0-h0_0.tar.bz2"));
        assert_eq!(view.excluded, 2);
    }
}
