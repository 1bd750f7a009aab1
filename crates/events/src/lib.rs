#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in repomirror
//!
//! All output goes through events - no direct logging or printing is
//! allowed outside the CLI. Library crates emit events describing what
//! happened; the CLI decides how to render them.

use repomirror_types::SubdirSummary;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted during a sync run
#[derive(Debug, Clone)]
pub enum Event {
    /// A sync run began
    SyncStarted {
        channel: String,
        subdirs: Vec<String>,
    },

    /// The remote index for a subdirectory was fetched and parsed
    IndexFetched {
        subdir: String,
        url: String,
        records: usize,
    },

    /// The download/remove plan for a subdirectory was computed
    PlanComputed {
        subdir: String,
        to_download: usize,
        to_remove: usize,
        download_bytes: u64,
    },

    /// A leftover download temporary from an earlier run was deleted
    StaleTempRemoved { path: PathBuf },

    /// Re-verification of already-present artifacts began
    VerifyStarted { subdir: String, files: usize },

    /// An existing artifact failed re-verification and was removed
    CorruptRemoved { filename: String },

    /// An artifact transfer began
    DownloadStarted {
        filename: String,
        url: String,
        total_size: Option<u64>,
    },

    /// Bytes arrived for an in-flight transfer
    DownloadProgress {
        filename: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A failed attempt will be retried after a delay
    DownloadRetrying {
        filename: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: String,
    },

    /// An artifact was fetched, validated, and promoted
    DownloadCompleted { filename: String, size: u64 },

    /// An artifact failed for good this run
    DownloadFailed { filename: String, error: String },

    /// A local file no longer listed upstream was deleted
    ArtifactPruned { filename: String },

    /// A prune deletion failed; the run continues
    PruneFailed { filename: String, error: String },

    /// An index was written for a subdirectory
    IndexPublished {
        subdir: String,
        records: usize,
        path: PathBuf,
    },

    /// Publication was withheld because of artifact failures
    PublishSkipped { subdir: String, failures: usize },

    /// One subdirectory finished
    SubdirCompleted { summary: SubdirSummary },

    /// Something notable but non-fatal happened
    Warning {
        message: String,
        context: Option<String>,
    },

    /// Plumbing detail useful when debugging
    DebugLog { message: String },
}

impl Event {
    /// Create a debug log event
    #[must_use]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::DebugLog {
            message: message.into(),
        }
    }

    /// Create a warning event
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: None,
        }
    }

    /// Create a warning event with context
    #[must_use]
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }
}

/// Type alias for event sender
pub type EventSender = UnboundedSender<Event>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<Event>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout the system
///
/// This trait provides a single, consistent API for emitting events
/// regardless of whether you have a raw `EventSender` or a struct that
/// contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: Event) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(Event::debug(message));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(Event::warning(message));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
