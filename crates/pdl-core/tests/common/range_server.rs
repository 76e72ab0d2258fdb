//! Minimal HTTP/1.1 origin for integration tests.
//!
//! Serves one static body for any path. Answers HEAD and GET, honours
//! `Range: bytes=X-Y` with 206 when ranges are enabled, and counts the range
//! requests it sees so tests can tell the ranged and sequential paths apart.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// `Accept-Ranges` value to advertise; None omits the header.
    pub accept_ranges: Option<&'static str>,
    /// If false, omit `Content-Length` and close the connection after the body.
    pub declare_length: bool,
    /// `Content-Disposition` value to send, if any.
    pub content_disposition: Option<&'static str>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            accept_ranges: Some("bytes"),
            declare_length: true,
            content_disposition: None,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Debug, Clone)]
pub struct RangeServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub url: String,
    requests: Arc<AtomicUsize>,
    range_requests: Arc<AtomicUsize>,
}

impl RangeServer {
    /// `url` joined with `path` (no leading slash).
    pub fn file_url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn range_requests(&self) -> usize {
        self.range_requests.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body` with default options.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (HEAD blocked, ranges missing, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = RangeServer {
        url: format!("http://127.0.0.1:{}/", port),
        requests: Arc::new(AtomicUsize::new(0)),
        range_requests: Arc::new(AtomicUsize::new(0)),
    };
    let body = Arc::new(body);
    let counters = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counters = counters.clone();
            thread::spawn(move || handle(stream, &body, opts, &counters));
        }
    });
    server
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(data).ok()
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions, counters: &RangeServer) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let request = match read_head(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let (method, range) = parse_request(&request);
    counters.requests.fetch_add(1, Ordering::SeqCst);
    if range.is_some() {
        counters.range_requests.fetch_add(1, Ordering::SeqCst);
    }

    let is_head = method.eq_ignore_ascii_case("HEAD");
    if is_head && !opts.head_allowed {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }
    if !is_head && !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    let total = body.len() as u64;
    let (status, content_range, slice) = match range {
        Some((start, end_incl)) if opts.support_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                (
                    "416 Range Not Satisfiable",
                    Some(format!("bytes */{}", total)),
                    &body[0..0],
                )
            } else {
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    &body[start as usize..=end_incl as usize],
                )
            }
        }
        _ => ("200 OK", None, body),
    };

    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    if opts.declare_length {
        head.push_str(&format!("Content-Length: {}\r\n", slice.len()));
    }
    if let Some(cr) = content_range {
        head.push_str(&format!("Content-Range: {}\r\n", cr));
    }
    if let Some(unit) = opts.accept_ranges {
        head.push_str(&format!("Accept-Ranges: {}\r\n", unit));
    }
    if let Some(cd) = opts.content_disposition {
        head.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    if !is_head {
        let _ = stream.write_all(slice);
    }
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                if let Some(part) = value.trim().strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
