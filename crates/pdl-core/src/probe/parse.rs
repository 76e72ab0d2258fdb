//! Interpret probe response headers: declared length and range support.

use crate::error::ProbeError;
use crate::transport::Headers;

use super::RangeSupport;

/// Total resource size from `Content-Length`.
pub(crate) fn declared_length(headers: &Headers) -> Result<u64, ProbeError> {
    let raw = headers
        .get("content-length")
        .ok_or(ProbeError::MissingLength)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ProbeError::InvalidLength(raw.to_string()))
}

/// Range support from `Accept-Ranges`.
///
/// Only the `bytes` unit counts as support. `none`, an empty value, or a missing
/// header mean ranges are unavailable; any other unit is reported as-is.
pub(crate) fn range_support(headers: &Headers) -> RangeSupport {
    let value = match headers.get("accept-ranges") {
        Some(v) => v.trim(),
        None => return RangeSupport::Absent,
    };
    let units: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .collect();
    if units.iter().any(|u| u.eq_ignore_ascii_case("bytes")) {
        RangeSupport::Bytes
    } else if units.is_empty() || units.iter().all(|u| u.eq_ignore_ascii_case("none")) {
        RangeSupport::Absent
    } else {
        RangeSupport::OtherUnit(value.to_string())
    }
}
