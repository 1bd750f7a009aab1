//! Orchestration of a full mirror synchronization run

use crate::filter::{effective_view, EffectiveView};
use crate::plan::{compute, SyncPlan};
use crate::scan::scan_dir;
use crate::{prune, verify};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use repomirror_config::Config;
use repomirror_errors::{Error, StorageError};
use repomirror_events::{Event, EventEmitter, EventSender};
use repomirror_index::{repodata_path, write_repodata, RepoData};
use repomirror_net::{
    fetch_text, ArtifactDownloader, ArtifactRequest, NetClient, NetConfig, RetryConfig,
};
use repomirror_types::{Channel, FilterSet, SubdirSummary, SyncReport};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

const MB: u64 = 1024 * 1024;

/// Terminal result of one artifact transfer
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Fetched, validated, and promoted to its final path
    Fetched { size: u64 },
    /// Never attempted; only happens when the run is cancelled
    Skipped,
    /// Failed for good this run
    Failed { error: Error, attempts: u32 },
}

/// The synchronization engine for one configured mirror.
///
/// Construction wires up the network stack from the validated
/// configuration; `sync` runs every configured subdirectory in order
/// and aggregates a report. All progress is emitted as events.
pub struct SyncEngine {
    channel: Channel,
    subdirs: Vec<String>,
    target: PathBuf,
    filters: FilterSet,
    latest_only: bool,
    max_packages: Option<usize>,
    verify_downloads: bool,
    verify_existing: bool,
    strict: bool,
    dry_run: bool,
    concurrency: usize,
    min_free_space_mb: u64,
    client: NetClient,
    downloader: ArtifactDownloader,
    tx: EventSender,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream is unparseable, a filter glob
    /// is invalid, or the HTTP client cannot be constructed.
    pub fn new(config: &Config, tx: EventSender, cancel: CancellationToken) -> Result<Self, Error> {
        let channel = config.upstream_channel()?;
        let filters = config.compile_filters()?;
        let client = NetClient::new(&NetConfig::from_network_config(&config.network))?;
        let downloader = ArtifactDownloader::new(
            client.clone(),
            RetryConfig::from_network_config(&config.network),
        );

        Ok(Self {
            channel,
            subdirs: config.mirror.subdirs.clone(),
            target: config.target_path(),
            filters,
            latest_only: config.mirror.latest_only,
            max_packages: config.mirror.max_packages,
            verify_downloads: config.verify.downloads,
            verify_existing: config.verify.existing,
            strict: config.mirror.strict,
            dry_run: false,
            concurrency: config.network.concurrency,
            min_free_space_mb: config.mirror.min_free_space_mb,
            client,
            downloader,
            tx,
            cancel,
        })
    }

    /// Plan only: fetch and diff but mutate nothing and publish nothing.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Synchronize every configured subdirectory against the upstream.
    ///
    /// Per-artifact failures are absorbed into the report; the caller
    /// decides what they mean for the process exit status.
    ///
    /// # Errors
    ///
    /// Returns an error for run-fatal conditions: index fetch or parse
    /// failure, local I/O failure, insufficient free space, or
    /// cancellation.
    pub async fn sync(&self) -> Result<SyncReport, Error> {
        let started = Instant::now();
        self.tx.emit(Event::SyncStarted {
            channel: self.channel.url(),
            subdirs: self.subdirs.clone(),
        });

        let mut report = SyncReport::default();
        for subdir in &self.subdirs {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let summary = self.sync_subdir(subdir).await?;
            self.tx.emit(Event::SubdirCompleted {
                summary: summary.clone(),
            });
            report.subdirs.push(summary);
        }

        if !self.dry_run {
            self.bootstrap_noarch().await?;
        }

        report.duration_ms = duration_ms(started);
        Ok(report)
    }

    async fn sync_subdir(&self, subdir: &str) -> Result<SubdirSummary, Error> {
        let started = Instant::now();
        let mut summary = SubdirSummary {
            subdir: subdir.to_string(),
            ..SubdirSummary::default()
        };

        let url = self.channel.repodata_url(subdir);
        let text = fetch_text(&self.client, &url, &self.tx).await?;
        let mut remote = RepoData::from_json(&text)?;
        remote.default_subdir(subdir);
        remote.validate()?;
        summary.remote_records = remote.record_count();
        self.tx.emit(Event::IndexFetched {
            subdir: subdir.to_string(),
            url,
            records: remote.record_count(),
        });

        let view = effective_view(&remote, &self.filters, self.latest_only);
        summary.excluded = view.excluded;

        let dir = self.target.join(subdir);
        let mut local = scan_dir(&dir).await?;

        if !self.dry_run {
            for temp in std::mem::take(&mut local.stale_temps) {
                match tokio::fs::remove_file(&temp).await {
                    Ok(()) => self.tx.emit(Event::StaleTempRemoved { path: temp }),
                    Err(e) => self.tx.emit(Event::warning_with_context(
                        format!("could not remove stale temp {}", temp.display()),
                        e.to_string(),
                    )),
                }
            }

            if self.verify_existing {
                summary.corrupt_removed = verify::verify_existing(
                    &dir,
                    &view.records,
                    &mut local,
                    self.concurrency,
                    subdir,
                    &self.tx,
                )
                .await?;
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
            }
        }

        let plan = compute(&view.records, &local, self.max_packages);
        summary.already_present = plan.present.len();
        self.tx.emit(Event::PlanComputed {
            subdir: subdir.to_string(),
            to_download: plan.to_download.len(),
            to_remove: plan.to_remove.len(),
            download_bytes: plan.download_bytes,
        });

        if self.dry_run {
            summary.duration_ms = duration_ms(started);
            return Ok(summary);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &dir))?;
        self.check_free_space(&dir, plan.download_bytes)?;

        // Download and prune touch disjoint filenames, so they may run
        // at the same time.
        let (outcomes, (pruned, prune_failures)) = tokio::join!(
            self.run_downloads(subdir, &dir, &plan, &view),
            prune::prune_extraneous(&dir, &plan.to_remove, &self.tx),
        );
        let outcomes = outcomes?;
        summary.pruned = pruned;
        summary.prune_failures = prune_failures;

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut keep: BTreeSet<String> = plan.present.iter().cloned().collect();
        for (filename, outcome) in outcomes {
            match outcome {
                DownloadOutcome::Fetched { size } => {
                    summary.downloaded += 1;
                    summary.downloaded_bytes += size;
                    keep.insert(filename);
                }
                DownloadOutcome::Failed { error, attempts } => {
                    summary.failed += 1;
                    self.tx.emit(Event::DownloadFailed {
                        filename,
                        error: format!("{error} (after {attempts} attempts)"),
                    });
                }
                DownloadOutcome::Skipped => {}
            }
        }

        if self.strict && summary.failed > 0 {
            self.tx.emit(Event::PublishSkipped {
                subdir: subdir.to_string(),
                failures: summary.failed,
            });
        } else {
            let published = remote.restrict_to(&keep);
            let path = write_repodata(&dir, &published).await?;
            self.tx.emit(Event::IndexPublished {
                subdir: subdir.to_string(),
                records: published.record_count(),
                path,
            });
            summary.published = true;
        }

        summary.duration_ms = duration_ms(started);
        Ok(summary)
    }

    async fn run_downloads(
        &self,
        subdir: &str,
        dir: &Path,
        plan: &SyncPlan,
        view: &EffectiveView<'_>,
    ) -> Result<Vec<(String, DownloadOutcome)>, Error> {
        let mut requests = Vec::with_capacity(plan.to_download.len());
        for filename in &plan.to_download {
            let Some(record) = view.records.get(filename.as_str()) else {
                continue;
            };
            let checksum = if self.verify_downloads {
                Some(record.checksum()?)
            } else {
                None
            };
            requests.push((
                ArtifactRequest {
                    filename: filename.clone(),
                    url: self.channel.artifact_url(subdir, filename),
                    expected_size: record.expected_size(),
                    checksum,
                },
                dir.join(filename),
            ));
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = FuturesUnordered::new();
        for (request, dest) in requests {
            let semaphore = Arc::clone(&semaphore);
            let downloader = self.downloader.clone();
            let cancel = self.cancel.clone();
            let tx = self.tx.clone();
            tasks.push(async move {
                let filename = request.filename.clone();
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (filename, DownloadOutcome::Skipped);
                };
                if cancel.is_cancelled() {
                    return (filename, DownloadOutcome::Skipped);
                }
                tokio::select! {
                    () = cancel.cancelled() => (filename, DownloadOutcome::Skipped),
                    result = downloader.download(&request, &dest, &tx) => match result {
                        Ok(size) => (filename, DownloadOutcome::Fetched { size }),
                        Err(failure) => (
                            filename,
                            DownloadOutcome::Failed {
                                error: failure.error,
                                attempts: failure.attempts,
                            },
                        ),
                    },
                }
            });
        }

        let mut outcomes = Vec::with_capacity(plan.to_download.len());
        while let Some(outcome) = tasks.next().await {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn check_free_space(&self, dir: &Path, planned_bytes: u64) -> Result<(), Error> {
        let available =
            fs2::available_space(dir).map_err(|e| Error::io_with_path(&e, dir))?;
        let floor = self.min_free_space_mb.saturating_mul(MB);

        if available.saturating_sub(planned_bytes) < floor {
            return Err(StorageError::InsufficientSpace {
                path: dir.display().to_string(),
                required_mb: planned_bytes.saturating_add(floor) / MB,
                available_mb: available / MB,
            }
            .into());
        }
        Ok(())
    }

    /// Clients expect a noarch index to exist even when noarch is not
    /// mirrored; write an empty one if the path is vacant.
    async fn bootstrap_noarch(&self) -> Result<(), Error> {
        let noarch_dir = self.target.join("noarch");
        let index_path = repodata_path(&noarch_dir);
        let exists = tokio::fs::try_exists(&index_path)
            .await
            .map_err(|e| Error::io_with_path(&e, &index_path))?;
        if exists {
            return Ok(());
        }

        let path = write_repodata(&noarch_dir, &RepoData::default()).await?;
        self.tx.emit(Event::IndexPublished {
            subdir: "noarch".to_string(),
            records: 0,
            path,
        });
        Ok(())
    }
}

fn duration_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
