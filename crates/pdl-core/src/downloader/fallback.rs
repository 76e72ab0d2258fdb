//! Sequential fallback: one plain GET streamed into the destination.
//!
//! Used when the origin does not advertise byte ranges. No partitioning, no
//! concurrency, and never a `Range` header.

use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::cancel::CancelToken;
use crate::error::{DownloadError, TransferError};
use crate::storage::{DestinationFile, PartialFile};
use crate::transport::{Request, Transport};

/// Download `url` into `destination`, returning the bytes written.
///
/// The destination is created only once the response head is in, so a
/// refused request leaves no file behind. When `expected_len` is known
/// (from the probe) the written length must match it. A file created by a
/// failed call is removed unless `keep_partial` is set.
pub fn download_sequential(
    transport: &dyn Transport,
    url: &str,
    destination: &Path,
    expected_len: Option<u64>,
    chunk_size: usize,
    keep_partial: bool,
    cancel: &CancelToken,
) -> Result<u64, DownloadError> {
    let response = transport
        .send(&Request::get(url))
        .map_err(|e| DownloadError::Fallback(TransferError::Request(e)))?;
    if !response.is_success() {
        return Err(DownloadError::Fallback(TransferError::Status(
            response.status,
        )));
    }

    let guard = PartialFile::new(destination, !keep_partial);
    let file = DestinationFile::create(destination).map_err(|source| DownloadError::Create {
        path: destination.to_path_buf(),
        source,
    })?;

    let mut body = response.body;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;
    loop {
        if cancel.is_canceled() {
            return Err(DownloadError::Canceled);
        }
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DownloadError::Fallback(TransferError::Stream(e))),
        };
        let nw = file
            .write_at(written, &buf[..n])
            .map_err(|e| DownloadError::Fallback(TransferError::Write(e)))?;
        written += nw as u64;
        if nw != n {
            return Err(DownloadError::Fallback(TransferError::ShortWrite {
                read: n,
                written: nw,
            }));
        }
    }

    if let Some(expected) = expected_len {
        if written != expected {
            return Err(DownloadError::Fallback(TransferError::SizeMismatch {
                expected,
                received: written,
            }));
        }
    }
    drop(file);
    guard.keep();
    tracing::debug!(url, bytes = written, "sequential download finished");
    Ok(written)
}
