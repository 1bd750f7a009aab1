#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Repository index for repomirror
//!
//! This crate models the per-subdirectory index document that lists all
//! artifacts a channel serves, parses it from untrusted upstream JSON,
//! and publishes the local copy atomically.

mod models;
mod publish;

pub use models::{PackageRecord, RepoData};
pub use publish::{read_repodata, repodata_path, write_repodata, REPODATA_FILENAME};
