//! HTTP capability injected into the prober, range workers and fallback.
//!
//! The engine only needs "issue a request, read the status and headers,
//! stream the body". Keeping that behind [`Transport`] lets tests script
//! slow bodies, short reads and header variations without a network.

mod easy;
mod headers;

pub use easy::{CurlOptions, CurlTransport};
pub use headers::Headers;

use std::fmt;
use std::io::Read;

use thiserror::Error;

/// Failure to establish a request or receive its response head.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("transfer thread: {0}")]
    Io(#[from] std::io::Error),
    #[error("transfer ended before a response head was received")]
    NoResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// One outgoing request. `range` is an inclusive byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub range: Option<(u64, u64)>,
}

impl Request {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            range: None,
        }
    }

    pub fn head(url: &str) -> Self {
        Self {
            method: Method::Head,
            ..Self::get(url)
        }
    }

    /// Ask for bytes `start..=end` only.
    pub fn with_range(mut self, start: u64, end: u64) -> Self {
        self.range = Some((start, end));
        self
    }

    /// `Range` header value, e.g. `bytes=0-1023`.
    pub fn range_header_value(&self) -> Option<String> {
        self.range.map(|(s, e)| format!("bytes={}-{}", s, e))
    }
}

/// Response head plus a streaming body. Dropping the body abandons the transfer.
pub struct Response {
    pub status: u32,
    pub headers: Headers,
    pub body: Box<dyn Read + Send>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues requests and hands back streaming responses.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}
