//! Capability probing.
//!
//! One request tells us how large the resource is and whether the origin
//! honours byte-range requests. An undeterminable length is fatal; missing
//! range support is not, it just routes the download to the sequential path.

mod parse;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::transport::{Headers, Request, Transport};

/// Request used for probing. `Get` matches what most origins answer
/// faithfully; `Head` avoids opening a body stream at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Get,
    Head,
}

/// What `Accept-Ranges` told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSupport {
    /// `Accept-Ranges: bytes`.
    Bytes,
    /// Header missing, empty, or `none`.
    Absent,
    /// Some other unit was advertised; the size is still known.
    OtherUnit(String),
}

/// Outcome of a successful probe.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub size: u64,
    pub range_support: RangeSupport,
    /// Full response headers, kept for filename derivation.
    pub headers: Headers,
}

impl ProbeResult {
    /// True only when a length is declared and `bytes` ranges are advertised.
    pub fn supports_ranges(&self) -> bool {
        self.range_support == RangeSupport::Bytes
    }
}

/// Probe `url` through `transport`. The response body is never read.
pub fn probe(
    transport: &dyn Transport,
    url: &str,
    method: ProbeMethod,
) -> Result<ProbeResult, ProbeError> {
    let request = match method {
        ProbeMethod::Get => Request::get(url),
        ProbeMethod::Head => Request::head(url),
    };
    let response = transport.send(&request).map_err(ProbeError::Request)?;
    if !response.is_success() {
        return Err(ProbeError::Status(response.status));
    }

    let size = parse::declared_length(&response.headers)?;
    let range_support = parse::range_support(&response.headers);
    tracing::debug!(url, size, ?range_support, ?method, "probe complete");

    Ok(ProbeResult {
        size,
        range_support,
        headers: response.headers,
    })
}
