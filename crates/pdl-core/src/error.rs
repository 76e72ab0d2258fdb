//! Error taxonomy for probing, range transfers and the download as a whole.
//!
//! Display strings do not repeat their source; print with `{:#}` (anyhow) or
//! walk `source()` to get the full chain.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::partition::PartitionError;
use crate::transport::TransportError;

/// The capability probe could not establish the resource length. Fatal.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe request failed")]
    Request(#[source] TransportError),
    #[error("probe returned HTTP {0}")]
    Status(u32),
    #[error("server did not declare a Content-Length")]
    MissingLength,
    #[error("server declared an unparseable Content-Length {0:?}")]
    InvalidLength(String),
}

/// Failure of a single transfer: one byte range, or the sequential body.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed")]
    Request(#[source] TransportError),
    #[error("server returned HTTP {0}")]
    Status(u32),
    #[error("response body stream failed")]
    Stream(#[source] io::Error),
    #[error("positioned write failed")]
    Write(#[source] io::Error),
    #[error("short write: {written} of {read} bytes")]
    ShortWrite { read: usize, written: usize },
    #[error("size mismatch: expected {expected} bytes, received {received}")]
    SizeMismatch { expected: u64, received: u64 },
}

/// Error returned by a download call. Exactly one is surfaced per call.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("capability probe failed")]
    Probe(#[from] ProbeError),

    /// Only produced when `strict_range_unit` is enabled; otherwise a
    /// non-`bytes` unit selects the sequential path.
    #[error("server advertises unsupported range unit {0:?}")]
    UnsupportedRangeUnit(String),

    #[error("range partitioning failed")]
    Partition(#[from] PartitionError),

    #[error("failed to create destination file {}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to preallocate destination file {}", path.display())]
    Preallocate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("range {index} failed")]
    Range {
        index: usize,
        #[source]
        source: TransferError,
    },

    #[error("sequential download failed")]
    Fallback(#[source] TransferError),

    #[error("worker for range {0} panicked")]
    WorkerPanicked(usize),

    #[error("download canceled")]
    Canceled,

    #[error("download task failed to join")]
    Join(#[from] tokio::task::JoinError),
}

impl DownloadError {
    /// Index of the failing range, when the error came from a range worker.
    pub fn range_index(&self) -> Option<usize> {
        match self {
            DownloadError::Range { index, .. } => Some(*index),
            DownloadError::WorkerPanicked(index) => Some(*index),
            _ => None,
        }
    }

    /// The transfer-level cause, for range and fallback failures.
    pub fn transfer_error(&self) -> Option<&TransferError> {
        match self {
            DownloadError::Range { source, .. } => Some(source),
            DownloadError::Fallback(source) => Some(source),
            _ => None,
        }
    }
}
