#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! The mirror synchronization engine
//!
//! Brings the pieces together: fetch the upstream index, reduce it to
//! the effective view, diff against what is on disk, download and
//! validate what is missing, prune what is no longer listed, and
//! publish a fresh index only for a consistent mirror state.

pub mod engine;
pub mod filter;
pub mod plan;
pub mod scan;

mod prune;
mod verify;

pub use engine::{DownloadOutcome, SyncEngine};
pub use filter::{effective_view, EffectiveView};
pub use plan::{compute, SyncPlan};
pub use scan::{scan_dir, LocalMirrorState};
