//! Range worker: fetch one byte range and write it at its offset.
//!
//! Lifecycle: Requesting -> Streaming -> Verifying -> Completed | Failed | Canceled.
//! The worker owns nothing shared except what [`WorkerContext`] hands it: the
//! transport, the destination handle (positioned writes inside its own range
//! only) and the cancellation token it polls before every chunk read.

use std::io::{ErrorKind, Read};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::TransferError;
use crate::partition::RangeSpec;
use crate::storage::DestinationFile;
use crate::transport::{Request, Transport};

/// Capabilities given to a worker when it is created.
#[derive(Clone)]
pub struct WorkerContext {
    pub transport: Arc<dyn Transport>,
    pub url: Arc<str>,
    pub file: DestinationFile,
    pub cancel: CancelToken,
    /// Upper bound on bytes read (and written) per step.
    pub chunk_size: usize,
}

/// Terminal state of one worker.
#[derive(Debug)]
pub enum WorkerStatus {
    Completed,
    Failed(TransferError),
    /// Stopped because cancellation was requested; the range is incomplete.
    Canceled,
}

#[derive(Debug)]
pub struct WorkerOutcome {
    pub index: usize,
    pub bytes_written: u64,
    pub status: WorkerStatus,
}

impl WorkerOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, WorkerStatus::Completed)
    }
}

enum Finish {
    Completed,
    Canceled,
}

/// Run one range to a terminal state. Never panics on transfer errors.
pub fn fetch_range(ctx: &WorkerContext, range: RangeSpec) -> WorkerOutcome {
    let mut bytes_written = 0u64;
    let status = match transfer(ctx, &range, &mut bytes_written) {
        Ok(Finish::Completed) => WorkerStatus::Completed,
        Ok(Finish::Canceled) => WorkerStatus::Canceled,
        Err(e) => WorkerStatus::Failed(e),
    };
    match &status {
        WorkerStatus::Completed => {
            tracing::debug!(index = range.index, bytes = bytes_written, "range completed")
        }
        WorkerStatus::Canceled => {
            tracing::debug!(index = range.index, bytes = bytes_written, "range canceled")
        }
        WorkerStatus::Failed(e) => {
            tracing::debug!(index = range.index, bytes = bytes_written, "range failed: {}", e)
        }
    }
    WorkerOutcome {
        index: range.index,
        bytes_written,
        status,
    }
}

fn transfer(
    ctx: &WorkerContext,
    range: &RangeSpec,
    written: &mut u64,
) -> Result<Finish, TransferError> {
    // Requesting
    if ctx.cancel.is_canceled() {
        return Ok(Finish::Canceled);
    }
    tracing::trace!(index = range.index, range = %range.header_value(), "requesting range");
    let request = Request::get(&ctx.url).with_range(range.start, range.end);
    let response = ctx
        .transport
        .send(&request)
        .map_err(TransferError::Request)?;
    if !response.is_success() {
        return Err(TransferError::Status(response.status));
    }
    let declared = response.headers.content_length();
    let mut body = response.body;

    // Streaming
    let limit = range.len();
    let mut buf = vec![0u8; ctx.chunk_size.max(1)];
    let mut offset = range.start;
    loop {
        if ctx.cancel.is_canceled() {
            return Ok(Finish::Canceled);
        }
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Stream(e)),
        };
        // Never write past `end`: those bytes belong to the next range.
        if *written + n as u64 > limit {
            return Err(TransferError::SizeMismatch {
                expected: limit,
                received: *written + n as u64,
            });
        }
        let nw = ctx
            .file
            .write_at(offset, &buf[..n])
            .map_err(TransferError::Write)?;
        *written += nw as u64;
        if nw != n {
            return Err(TransferError::ShortWrite {
                read: n,
                written: nw,
            });
        }
        offset += n as u64;
    }

    // Verifying
    let expected = declared.unwrap_or(limit);
    if *written != expected {
        return Err(TransferError::SizeMismatch {
            expected,
            received: *written,
        });
    }
    if *written != limit {
        return Err(TransferError::SizeMismatch {
            expected: limit,
            received: *written,
        });
    }
    Ok(Finish::Completed)
}
