//! Download coordinator.
//!
//! Probes the origin, picks the ranged or sequential path, partitions the
//! resource, runs one scoped thread per range against a shared destination
//! file and turns the worker outcomes into exactly one result. The first
//! failing range cancels its siblings; every thread is joined before a call
//! returns.

pub mod fallback;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::cancel::CancelToken;
use crate::config::PdlConfig;
use crate::error::{DownloadError, TransferError};
use crate::partition::{partition, RangeSpec};
use crate::probe::{probe, ProbeMethod, RangeSupport};
use crate::storage::{DestinationFile, PartialFile};
use crate::transport::{CurlTransport, Headers, Transport};
use crate::url_model::derive_filename;

use self::worker::{fetch_range, WorkerContext, WorkerOutcome, WorkerStatus};

/// Per-downloader knobs, usually taken from [`PdlConfig`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub chunk_size: usize,
    pub probe_method: ProbeMethod,
    /// Fail with [`DownloadError::UnsupportedRangeUnit`] instead of falling
    /// back when the origin advertises a unit other than `bytes`.
    pub strict_range_unit: bool,
    /// Leave the incomplete output in place when a download fails.
    pub keep_partial: bool,
    /// Where derived filenames land when no destination is given.
    pub download_dir: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from(&PdlConfig::default())
    }
}

impl From<&PdlConfig> for DownloadOptions {
    fn from(cfg: &PdlConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size,
            probe_method: cfg.probe_method,
            strict_range_unit: cfg.strict_range_unit,
            keep_partial: cfg.keep_partial,
            download_dir: cfg.download_dir.clone(),
        }
    }
}

/// What one call is downloading, fixed once the probe is in.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub url: String,
    pub destination: PathBuf,
    pub size: u64,
    pub range_support: RangeSupport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Concurrent byte ranges.
    Ranged,
    /// One plain GET; the origin does not advertise byte ranges.
    Sequential,
    /// Zero-length resource; no transfer was needed.
    Empty,
}

/// Summary of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub destination: PathBuf,
    pub bytes: u64,
    /// Number of range workers that ran (0 unless `mode` is `Ranged`).
    pub ranges: usize,
    pub mode: DownloadMode,
}

/// Parallel-range downloader over an injected [`Transport`].
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
    options: DownloadOptions,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>, options: DownloadOptions) -> Self {
        Self { transport, options }
    }

    /// Downloader backed by libcurl with the connection settings from `cfg`.
    pub fn from_config(cfg: &PdlConfig) -> Self {
        let transport = CurlTransport::new(cfg.http.curl_options());
        Self::new(Arc::new(transport), DownloadOptions::from(cfg))
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Download `url` into `destination` with `worker_count` concurrent ranges.
    ///
    /// An empty `destination` (or an existing directory) gets a filename
    /// derived from the response headers and the URL.
    pub fn download(
        &self,
        url: &str,
        destination: &Path,
        worker_count: usize,
    ) -> Result<DownloadReport, DownloadError> {
        self.download_with_cancel(url, destination, worker_count, &CancelToken::new())
    }

    /// Like [`Downloader::download`], stopping early once `cancel` fires.
    pub fn download_with_cancel(
        &self,
        url: &str,
        destination: &Path,
        worker_count: usize,
        cancel: &CancelToken,
    ) -> Result<DownloadReport, DownloadError> {
        if worker_count == 0 {
            return Err(DownloadError::InvalidWorkerCount);
        }
        if cancel.is_canceled() {
            return Err(DownloadError::Canceled);
        }

        let probed = probe(self.transport.as_ref(), url, self.options.probe_method)?;
        let target = DownloadTarget {
            url: url.to_string(),
            destination: self.resolve_destination(url, destination, &probed.headers),
            size: probed.size,
            range_support: probed.range_support,
        };
        tracing::info!(
            url,
            destination = %target.destination.display(),
            size = target.size,
            "starting download"
        );
        if cancel.is_canceled() {
            return Err(DownloadError::Canceled);
        }

        let result = match &target.range_support {
            RangeSupport::Bytes => self.download_ranged(&target, worker_count, cancel),
            RangeSupport::OtherUnit(unit) if self.options.strict_range_unit => {
                Err(DownloadError::UnsupportedRangeUnit(unit.clone()))
            }
            support => {
                tracing::info!(?support, "byte ranges not advertised, downloading sequentially");
                self.download_fallback(&target, cancel)
            }
        };

        match &result {
            Ok(report) => tracing::info!(
                destination = %report.destination.display(),
                bytes = report.bytes,
                ranges = report.ranges,
                mode = ?report.mode,
                "download complete"
            ),
            Err(e) => tracing::warn!(url, "download failed: {}", e),
        }
        result
    }

    /// Async facade: runs the blocking download on tokio's blocking pool.
    pub async fn download_async(
        &self,
        url: String,
        destination: PathBuf,
        worker_count: usize,
        cancel: CancelToken,
    ) -> Result<DownloadReport, DownloadError> {
        let downloader = self.clone();
        tokio::task::spawn_blocking(move || {
            downloader.download_with_cancel(&url, &destination, worker_count, &cancel)
        })
        .await?
    }

    fn resolve_destination(&self, url: &str, destination: &Path, headers: &Headers) -> PathBuf {
        if destination.as_os_str().is_empty() {
            let dir = self.options.download_dir.clone().unwrap_or_default();
            dir.join(derive_filename(url, headers))
        } else if destination.is_dir() {
            destination.join(derive_filename(url, headers))
        } else {
            destination.to_path_buf()
        }
    }

    fn download_fallback(
        &self,
        target: &DownloadTarget,
        cancel: &CancelToken,
    ) -> Result<DownloadReport, DownloadError> {
        let bytes = fallback::download_sequential(
            self.transport.as_ref(),
            &target.url,
            &target.destination,
            Some(target.size),
            self.options.chunk_size,
            self.options.keep_partial,
            cancel,
        )?;
        Ok(DownloadReport {
            destination: target.destination.clone(),
            bytes,
            ranges: 0,
            mode: DownloadMode::Sequential,
        })
    }

    fn download_ranged(
        &self,
        target: &DownloadTarget,
        worker_count: usize,
        cancel: &CancelToken,
    ) -> Result<DownloadReport, DownloadError> {
        let path = target.destination.as_path();
        if target.size == 0 {
            DestinationFile::create(path).map_err(|source| DownloadError::Create {
                path: path.to_path_buf(),
                source,
            })?;
            return Ok(DownloadReport {
                destination: path.to_path_buf(),
                bytes: 0,
                ranges: 0,
                mode: DownloadMode::Empty,
            });
        }

        let workers = if worker_count as u64 > target.size {
            tracing::warn!(
                requested = worker_count,
                size = target.size,
                "more workers than bytes, clamping to one byte per worker"
            );
            target.size as usize
        } else {
            worker_count
        };
        let ranges = partition(target.size, workers)?;

        let guard = PartialFile::new(path, !self.options.keep_partial);
        let file = DestinationFile::create(path).map_err(|source| DownloadError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        file.preallocate(target.size)
            .map_err(|source| DownloadError::Preallocate {
                path: path.to_path_buf(),
                source,
            })?;

        let ctx = WorkerContext {
            transport: Arc::clone(&self.transport),
            url: Arc::from(target.url.as_str()),
            file,
            cancel: cancel.child(),
            chunk_size: self.options.chunk_size,
        };
        let summary = run_workers(&ctx, &ranges);
        drop(ctx);

        if let Some((index, source)) = summary.first_failure {
            return Err(DownloadError::Range { index, source });
        }
        if let Some(&index) = summary.panicked.first() {
            return Err(DownloadError::WorkerPanicked(index));
        }
        if summary.completed != ranges.len() {
            return Err(DownloadError::Canceled);
        }

        guard.keep();
        Ok(DownloadReport {
            destination: path.to_path_buf(),
            bytes: summary.bytes,
            ranges: ranges.len(),
            mode: DownloadMode::Ranged,
        })
    }
}

/// Aggregated outcomes of one ranged run.
#[derive(Debug, Default)]
pub(crate) struct RunSummary {
    pub completed: usize,
    pub canceled: usize,
    /// Bytes written by completed ranges.
    pub bytes: u64,
    /// The failure that canceled the run. Later failures are dropped.
    pub first_failure: Option<(usize, TransferError)>,
    pub panicked: Vec<usize>,
}

/// Cancels the run if the worker thread unwinds.
struct CancelOnPanic(CancelToken);

impl Drop for CancelOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.cancel();
        }
    }
}

/// One scoped thread per range; all of them are joined before returning.
///
/// Outcomes arrive on a single channel in completion order. The first
/// `Failed` outcome cancels `ctx.cancel` so the remaining workers stop at
/// their next chunk boundary.
pub(crate) fn run_workers(ctx: &WorkerContext, ranges: &[RangeSpec]) -> RunSummary {
    let (tx, rx) = mpsc::channel::<WorkerOutcome>();
    let mut summary = RunSummary::default();

    thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .iter()
            .map(|&range| {
                let tx = tx.clone();
                let worker = ctx.clone();
                let handle = scope.spawn(move || {
                    let _panic_guard = CancelOnPanic(worker.cancel.clone());
                    let _ = tx.send(fetch_range(&worker, range));
                });
                (range.index, handle)
            })
            .collect();
        drop(tx);

        for outcome in rx {
            match outcome.status {
                WorkerStatus::Completed => {
                    summary.completed += 1;
                    summary.bytes += outcome.bytes_written;
                }
                WorkerStatus::Canceled => summary.canceled += 1,
                WorkerStatus::Failed(err) if summary.first_failure.is_none() => {
                    tracing::debug!(index = outcome.index, "range failed, canceling siblings");
                    ctx.cancel.cancel();
                    summary.first_failure = Some((outcome.index, err));
                }
                WorkerStatus::Failed(err) => {
                    tracing::debug!(index = outcome.index, "discarding later failure: {}", err);
                }
            }
        }

        for (index, handle) in handles {
            if handle.join().is_err() {
                tracing::warn!(index, "range worker panicked");
                summary.panicked.push(index);
            }
        }
    });
    summary
}
