//! Command line interface definition

use clap::Parser;
use std::path::PathBuf;

/// repomirror - mirror conda channels into a local directory
#[derive(Parser, Debug)]
#[command(name = "repomirror")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mirror a conda channel into a local directory")]
#[command(long_about = None)]
pub struct Cli {
    /// Upstream channel: a bare name (resolved on anaconda.org) or a full URL
    #[arg(long, value_name = "CHANNEL")]
    pub upstream: Option<String>,

    /// Platform subdirectory to mirror (repeatable)
    #[arg(long = "subdir", value_name = "SUBDIR")]
    pub subdirs: Vec<String>,

    /// Local mirror root directory
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Use alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Concurrent artifact downloads
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Total attempts per artifact, first try included
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// HTTP(S) proxy URL
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Plan and report without downloading, deleting, or publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip digest verification of fresh downloads (sizes are still checked)
    #[arg(long)]
    pub no_verify: bool,

    /// Skip re-hashing artifacts already on disk
    #[arg(long)]
    pub no_verify_existing: bool,

    /// Withhold index publication for any subdirectory with failures
    #[arg(long)]
    pub strict: bool,

    /// Keep only the highest version of each package
    #[arg(long)]
    pub latest_only: bool,

    /// Cap the number of artifacts downloaded per subdirectory
    #[arg(long, value_name = "N")]
    pub max_packages: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress bars and status lines
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
