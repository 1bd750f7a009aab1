//! Event handling and progress display

use indicatif::{
    HumanBytes, HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle,
};
use repomirror_events::Event;
use std::collections::HashMap;
use std::time::Duration;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    /// Multi-progress manager for concurrent progress bars
    multi_progress: MultiProgress,
    /// Active progress bars by artifact filename
    download_bars: HashMap<String, ProgressBar>,
}

impl EventHandler {
    /// Create new event handler
    ///
    /// In quiet mode the draw target is hidden, which swallows both the
    /// progress bars and the status lines printed above them.
    pub fn new(quiet: bool) -> Self {
        let multi_progress = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        Self {
            multi_progress,
            download_bars: HashMap::new(),
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            // Run lifecycle events
            Event::SyncStarted { channel, subdirs } => {
                self.show_status(&format!("🔄 Syncing {} [{}]", channel, subdirs.join(", ")));
            }
            Event::IndexFetched {
                subdir,
                url,
                records,
            } => {
                tracing::debug!("fetched index from {url}");
                self.show_status(&format!(
                    "📥 {subdir}: remote index lists {records} packages"
                ));
            }
            Event::PlanComputed {
                subdir,
                to_download,
                to_remove,
                download_bytes,
            } => {
                self.show_status(&format!(
                    "📋 {subdir}: {to_download} to download ({}), {to_remove} to remove",
                    HumanBytes(download_bytes)
                ));
            }

            // Local state events
            Event::StaleTempRemoved { path } => {
                tracing::debug!("removed stale temporary {}", path.display());
            }
            Event::VerifyStarted { subdir, files } => {
                self.show_status(&format!(
                    "🔍 {subdir}: re-verifying {files} existing artifacts"
                ));
            }
            Event::CorruptRemoved { filename } => {
                self.show_status(&format!("⚠️  removed corrupt artifact {filename}"));
            }

            // Download events
            Event::DownloadStarted {
                filename,
                url,
                total_size,
            } => {
                tracing::debug!("downloading {url}");
                self.handle_download_started(&filename, total_size);
            }
            Event::DownloadProgress {
                filename,
                bytes_downloaded,
                total_bytes,
            } => {
                self.handle_download_progress(&filename, bytes_downloaded, total_bytes);
            }
            Event::DownloadRetrying {
                filename,
                attempt,
                max_attempts,
                delay,
                error,
            } => {
                if let Some(pb) = self.download_bars.remove(&filename) {
                    pb.finish_and_clear();
                    self.multi_progress.remove(&pb);
                }
                self.show_status(&format!(
                    "🔄 retrying {filename} ({attempt}/{max_attempts}) in {}: {error}",
                    HumanDuration(delay)
                ));
            }
            Event::DownloadCompleted { filename, size } => {
                self.handle_download_completed(&filename, size);
            }
            Event::DownloadFailed { filename, error } => {
                self.handle_download_failed(&filename, &error);
            }

            // Prune events
            Event::ArtifactPruned { filename } => {
                self.show_status(&format!("🧹 pruned {filename}"));
            }
            Event::PruneFailed { filename, error } => {
                self.show_status(&format!("⚠️  failed to prune {filename}: {error}"));
            }

            // Publication events
            Event::IndexPublished {
                subdir,
                records,
                path,
            } => {
                tracing::debug!("wrote index to {}", path.display());
                self.show_status(&format!(
                    "✅ {subdir}: published index with {records} packages"
                ));
            }
            Event::PublishSkipped { subdir, failures } => {
                self.show_status(&format!(
                    "⚠️  {subdir}: publication withheld ({failures} failed artifacts)"
                ));
            }
            Event::SubdirCompleted { summary } => {
                let marker = if summary.failed == 0 { "✅" } else { "⚠️ " };
                self.show_status(&format!(
                    "{} {}: {} downloaded ({}), {} present, {} failed, {} pruned in {}",
                    marker,
                    summary.subdir,
                    summary.downloaded,
                    HumanBytes(summary.downloaded_bytes),
                    summary.already_present,
                    summary.failed,
                    summary.pruned,
                    HumanDuration(Duration::from_millis(summary.duration_ms)),
                ));
            }

            // Diagnostics
            Event::Warning { message, context } => match context {
                Some(context) => self.show_status(&format!("⚠️  {message} ({context})")),
                None => self.show_status(&format!("⚠️  {message}")),
            },
            Event::DebugLog { message } => {
                tracing::debug!("{message}");
            }
        }
    }

    /// Clear any bars left behind by an aborted run
    pub fn finish(&mut self) {
        for (_, pb) in self.download_bars.drain() {
            pb.finish_and_clear();
        }
        self.multi_progress.clear().unwrap_or(());
    }

    /// Handle download started event
    fn handle_download_started(&mut self, filename: &str, total_size: Option<u64>) {
        let pb = if let Some(total) = total_size {
            ProgressBar::new(total)
        } else {
            ProgressBar::new_spinner()
        };

        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
        );
        pb.set_message(filename.to_string());

        let pb = self.multi_progress.add(pb);
        self.download_bars.insert(filename.to_string(), pb);
    }

    /// Handle download progress event
    fn handle_download_progress(
        &mut self,
        filename: &str,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    ) {
        if let Some(pb) = self.download_bars.get(filename) {
            if let Some(total) = total_bytes {
                pb.set_length(total);
            }
            pb.set_position(bytes_downloaded);
        }
    }

    /// Handle download completed event
    fn handle_download_completed(&mut self, filename: &str, size: u64) {
        if let Some(pb) = self.download_bars.remove(filename) {
            pb.finish_and_clear();
            self.multi_progress.remove(&pb);
        }
        self.show_status(&format!("✅ {filename} ({})", HumanBytes(size)));
    }

    /// Handle download failed event
    fn handle_download_failed(&mut self, filename: &str, error: &str) {
        if let Some(pb) = self.download_bars.remove(filename) {
            pb.finish_and_clear();
            self.multi_progress.remove(&pb);
        }
        self.show_status(&format!("❌ {filename}: {error}"));
    }

    /// Show status message
    fn show_status(&self, message: &str) {
        // Use multi_progress to avoid interfering with progress bars
        self.multi_progress.println(message).unwrap_or(());
    }
}
