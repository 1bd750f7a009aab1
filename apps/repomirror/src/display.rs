//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use indicatif::HumanBytes;
use repomirror_errors::{Error, UserFacingError};
use repomirror_types::SyncReport;
use std::fmt::Write;

/// Print the end-of-run summary table and totals line
pub fn render_summary(report: &SyncReport) {
    println!("{}", summary_table(report));

    let status = if report.is_clean() {
        style("clean").green().bold()
    } else {
        style("completed with failures").yellow().bold()
    };
    println!(
        "{status}: {} artifacts downloaded ({}), {} failed, {}",
        report.total_downloaded(),
        HumanBytes(report.total_downloaded_bytes()),
        report.total_failed(),
        seconds(report.duration_ms),
    );
}

/// Render a fatal error together with any remediation hint it carries
pub fn render_error(error: &Error) -> String {
    let mut message = error.user_message().into_owned();
    if let Some(hint) = error.user_hint() {
        let _ = write!(message, "\n  Hint: {hint}");
    }
    if error.is_retryable() {
        let _ = write!(message, "\n  Retry: safe to retry this operation.");
    }
    message
}

fn summary_table(report: &SyncReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Subdir").add_attribute(Attribute::Bold),
        Cell::new("Remote").add_attribute(Attribute::Bold),
        Cell::new("Excluded").add_attribute(Attribute::Bold),
        Cell::new("Downloaded").add_attribute(Attribute::Bold),
        Cell::new("Present").add_attribute(Attribute::Bold),
        Cell::new("Failed").add_attribute(Attribute::Bold),
        Cell::new("Pruned").add_attribute(Attribute::Bold),
        Cell::new("Published").add_attribute(Attribute::Bold),
        Cell::new("Time").add_attribute(Attribute::Bold),
    ]);

    for summary in &report.subdirs {
        let failed = if summary.failed > 0 {
            Cell::new(summary.failed).fg(Color::Red)
        } else {
            Cell::new(summary.failed)
        };
        let published = if summary.published {
            Cell::new("yes")
        } else {
            Cell::new("no").fg(Color::Yellow)
        };

        table.add_row(vec![
            Cell::new(&summary.subdir),
            Cell::new(summary.remote_records),
            Cell::new(summary.excluded),
            Cell::new(summary.downloaded),
            Cell::new(summary.already_present),
            failed,
            Cell::new(summary.pruned),
            published,
            Cell::new(seconds(summary.duration_ms)),
        ]);
    }

    table
}

fn seconds(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}
