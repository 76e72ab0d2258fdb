//! Destination filename derivation.
//!
//! Used only when the caller leaves the destination empty or points it at a
//! directory. Candidates, in order: the `Content-Disposition` filename, any
//! header whose name mentions `filename` (e.g. `X-Filename`), the last URL
//! path segment, and finally a timestamped `<YYYYmmddHHMMSS>_unknown`.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::disposition_filename;
pub use path::filename_from_url;
pub use sanitize::sanitize_filename;

use chrono::{DateTime, Local};

use crate::transport::Headers;

/// Derive a safe local filename from the probe response and URL.
pub fn derive_filename(url: &str, headers: &Headers) -> String {
    derive_filename_at(url, headers, Local::now())
}

/// As [`derive_filename`], with the clock supplied for the timestamp fallback.
pub fn derive_filename_at(url: &str, headers: &Headers, now: DateTime<Local>) -> String {
    let from_disposition = headers
        .get("content-disposition")
        .and_then(disposition_filename);
    let from_custom_header = headers
        .iter()
        .find(|(name, _)| {
            let name = name.to_ascii_lowercase();
            name != "content-disposition" && name.contains("filename")
        })
        .map(|(_, value)| value.trim().trim_matches('"').to_string());

    [from_disposition, from_custom_header, filename_from_url(url)]
        .into_iter()
        .flatten()
        .map(|candidate| sanitize_filename(&candidate))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{}_unknown", now.format("%Y%m%d%H%M%S")))
}
