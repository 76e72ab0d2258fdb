//! Parallel-range HTTP download engine.
//!
//! Probe the origin once, split the resource into contiguous byte ranges,
//! fetch them concurrently into one preallocated file, and fall back to a
//! single sequential GET when the origin does not advertise byte ranges.

pub mod cancel;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod partition;
pub mod probe;
pub mod storage;
pub mod transport;
pub mod url_model;

#[cfg(test)]
mod testing;

use std::path::Path;

pub use cancel::CancelToken;
pub use config::PdlConfig;
pub use downloader::{DownloadMode, DownloadOptions, DownloadReport, DownloadTarget, Downloader};
pub use error::{DownloadError, ProbeError, TransferError};
pub use partition::{partition, PartitionError, RangeSpec};
pub use probe::{ProbeMethod, ProbeResult, RangeSupport};
pub use transport::{CurlOptions, CurlTransport, Transport};

/// Download `url` into `destination` with `worker_count` concurrent ranges,
/// using the default configuration and the libcurl transport.
pub fn download(
    url: &str,
    destination: &Path,
    worker_count: usize,
) -> Result<DownloadReport, DownloadError> {
    Downloader::from_config(&PdlConfig::default()).download(url, destination, worker_count)
}
