//! repomirror - conda channel mirroring tool
//!
//! The binary wires configuration, the sync engine, and event rendering
//! together. All mirror logic lives in the library crates; this crate
//! only decides how a run looks on a terminal and what exit code it
//! leaves behind.

mod cli;
mod display;
mod events;

use crate::cli::Cli;
use crate::events::EventHandler;
use clap::Parser;
use repomirror_config::Config;
use repomirror_errors::Error;
use repomirror_events::EventReceiver;
use repomirror_sync::SyncEngine;
use repomirror_types::SyncReport;
use std::process;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        // The mirror is usable but incomplete; cron jobs key off this
        Ok(report) if report.total_failed() > 0 => process::exit(2),
        Ok(_) => {}
        Err(e) => {
            error!("sync failed: {e}");
            eprintln!("Error: {}", display::render_error(&e));
            process::exit(1);
        }
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<SyncReport, Error> {
    info!("starting repomirror v{}", env!("CARGO_PKG_VERSION"));

    // Configuration precedence: file, then environment, then CLI flags
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let (event_sender, event_receiver) = repomirror_events::channel();
    let engine = SyncEngine::new(&config, event_sender, cancel)?.with_dry_run(cli.dry_run);

    let mut handler = EventHandler::new(cli.quiet);
    let report = drive_sync(&engine, event_receiver, &mut handler).await?;

    if !cli.quiet {
        display::render_summary(&report);
    }

    info!("sync finished in {}ms", report.duration_ms);
    Ok(report)
}

/// Drive the sync future while rendering its events concurrently
async fn drive_sync(
    engine: &SyncEngine,
    mut events: EventReceiver,
    handler: &mut EventHandler,
) -> Result<SyncReport, Error> {
    let mut sync_future = Box::pin(engine.sync());

    loop {
        select! {
            // Engine finished
            result = &mut sync_future => {
                // Drain any remaining events
                while let Ok(event) = events.try_recv() {
                    handler.handle_event(event);
                }
                handler.finish();
                return result;
            }

            // Event received
            event = events.recv() => {
                match event {
                    Some(event) => handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for the engine */ }
                }
            }
        }
    }
}

/// Cancel the run on Ctrl+C; the engine publishes no index after that
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
}

/// Initialize tracing to stderr, where log lines interleave safely
/// above the progress draw area. `RUST_LOG` overrides the -v count.
fn init_tracing(verbosity: u8) {
    let directives = match verbosity {
        0 => "warn",
        1 => "warn,repomirror=info",
        2 => "info,repomirror=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives)),
        )
        .init();
}

/// Apply CLI flag overrides (highest precedence)
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(upstream) = &cli.upstream {
        config.mirror.upstream = Some(upstream.clone());
    }
    if !cli.subdirs.is_empty() {
        config.mirror.subdirs = cli.subdirs.clone();
    }
    if let Some(target) = &cli.target {
        config.mirror.target = Some(target.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.network.concurrency = concurrency;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.network.max_attempts = max_attempts;
    }
    if let Some(timeout) = cli.timeout {
        config.network.timeout_secs = timeout;
    }
    if let Some(proxy) = &cli.proxy {
        config.network.proxy = Some(proxy.clone());
    }
    if cli.insecure {
        config.network.insecure = true;
    }
    if cli.no_verify {
        config.verify.downloads = false;
    }
    if cli.no_verify_existing {
        config.verify.existing = false;
    }
    if cli.strict {
        config.mirror.strict = true;
    }
    if cli.latest_only {
        config.mirror.latest_only = true;
    }
    if let Some(max_packages) = cli.max_packages {
        config.mirror.max_packages = Some(max_packages);
    }
}
