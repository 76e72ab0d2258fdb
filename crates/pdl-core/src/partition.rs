//! Range partitioning: split `[0, size)` into contiguous inclusive byte ranges.

use thiserror::Error;

/// One worker's share of the resource: bytes `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// Ordinal `0..N-1`, used to name the range in logs and errors.
    pub index: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl RangeSpec {
    /// Number of bytes in the range. Never zero.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Range` header value, e.g. `bytes=0-2499999`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("cannot partition an empty resource")]
    ZeroSize,
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("{workers} workers exceed the {size} bytes available")]
    MoreWorkersThanBytes { size: u64, workers: usize },
}

/// Split `size` bytes into exactly `worker_count` ranges.
///
/// Every range but the last gets `size / worker_count` bytes; the last one also
/// takes the remainder, so the union is exactly `[0, size)`.
pub fn partition(size: u64, worker_count: usize) -> Result<Vec<RangeSpec>, PartitionError> {
    if size == 0 {
        return Err(PartitionError::ZeroSize);
    }
    if worker_count == 0 {
        return Err(PartitionError::ZeroWorkers);
    }
    if worker_count as u64 > size {
        return Err(PartitionError::MoreWorkersThanBytes {
            size,
            workers: worker_count,
        });
    }

    let chunk = size / worker_count as u64;
    let last = worker_count - 1;
    let ranges = (0..worker_count)
        .map(|index| {
            let start = index as u64 * chunk;
            let end = if index == last {
                size - 1
            } else {
                start + chunk - 1
            };
            RangeSpec { index, start, end }
        })
        .collect();
    Ok(ranges)
}
