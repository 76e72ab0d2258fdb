//! Filename hint from the URL path.

use super::content_disposition::percent_decode;

/// Last non-empty path segment of `url`, percent-decoded.
///
/// `None` when the URL does not parse or has no usable segment.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = String::from_utf8_lossy(&percent_decode(segment)).into_owned();
    match decoded.as_str() {
        "." | ".." => None,
        _ => Some(decoded),
    }
}
