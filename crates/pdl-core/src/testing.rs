//! Scripted in-memory transport for unit tests.
//!
//! Serves one static body the way a range-capable origin would, with knobs
//! for header variations, slow bodies and per-range faults.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::transport::{Headers, Method, Request, Response, Transport, TransportError};

#[derive(Debug, Clone)]
pub(crate) struct ServerBehavior {
    /// `Accept-Ranges` value; `None` omits the header.
    pub accept_ranges: Option<String>,
    pub declare_length: bool,
    /// Status for every response, replacing 200/206.
    pub status_override: Option<u32>,
    pub refuse_connections: bool,
    /// Answer range requests with the whole body and 200.
    pub ignore_range: bool,
    /// Upper bound of bytes returned by one `read`.
    pub read_size: usize,
    /// Sleep before every body read.
    pub read_delay: Option<Duration>,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            accept_ranges: Some("bytes".to_string()),
            declare_length: true,
            status_override: None,
            refuse_connections: false,
            ignore_range: false,
            read_size: 4096,
            read_delay: None,
        }
    }
}

/// Misbehaviour for the range request that starts at a given offset.
#[derive(Debug, Clone)]
pub(crate) enum Fault {
    Refuse,
    Status(u32),
    /// Serve this many bytes, then fail the body read.
    StreamErrorAfter(usize),
    /// Serve only this many bytes, declaring the full range length.
    Truncate(usize),
    /// Declare this `Content-Length` while serving the real range.
    DeclareLength(u64),
}

pub(crate) struct ScriptedTransport {
    body: Arc<Vec<u8>>,
    behavior: ServerBehavior,
    faults: Mutex<HashMap<u64, Fault>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(body: Vec<u8>) -> Self {
        Self::with_behavior(body, ServerBehavior::default())
    }

    pub fn with_behavior(body: Vec<u8>, behavior: ServerBehavior) -> Self {
        Self {
            body: Arc::new(body),
            behavior,
            faults: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Inject `fault` into the range request whose first byte is `start`.
    pub fn fault_at(self, start: u64, fault: Fault) -> Self {
        self.faults.lock().unwrap().insert(start, fault);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn range_requests(&self) -> usize {
        self.requests().iter().filter(|r| r.range.is_some()).count()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let b = &self.behavior;
        if b.refuse_connections {
            return Err(refused());
        }

        let total = self.body.len() as u64;
        let fault = request
            .range
            .and_then(|(start, _)| self.faults.lock().unwrap().get(&start).cloned());

        let (mut status, slice) = match request.range {
            Some((start, end)) if !b.ignore_range => {
                let end = end.min(total.saturating_sub(1));
                (206, self.body[start as usize..=end as usize].to_vec())
            }
            _ => (200, self.body.to_vec()),
        };
        let mut declared = slice.len() as u64;
        let mut served = slice;
        let mut fail_after = None;

        match fault {
            Some(Fault::Refuse) => return Err(refused()),
            Some(Fault::Status(code)) => status = code,
            Some(Fault::StreamErrorAfter(n)) => fail_after = Some(n),
            Some(Fault::Truncate(n)) => served.truncate(n),
            Some(Fault::DeclareLength(n)) => declared = n,
            None => {}
        }
        if let Some(code) = b.status_override {
            status = code;
        }

        let mut headers = Headers::new();
        if b.declare_length {
            headers.insert("Content-Length", declared.to_string());
        }
        if let Some(unit) = &b.accept_ranges {
            headers.insert("Accept-Ranges", unit.clone());
        }
        if status == 206 {
            if let Some((start, _)) = request.range {
                let last = start + declared.saturating_sub(1);
                headers.insert("Content-Range", format!("bytes {}-{}/{}", start, last, total));
            }
        }

        if request.method == Method::Head {
            served.clear();
        }
        Ok(Response {
            status,
            headers,
            body: Box::new(ScriptedBody {
                data: served,
                pos: 0,
                read_size: b.read_size.max(1),
                delay: b.read_delay,
                fail_after,
            }),
        })
    }
}

fn refused() -> TransportError {
    TransportError::Io(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

struct ScriptedBody {
    data: Vec<u8>,
    pos: usize,
    read_size: usize,
    delay: Option<Duration>,
    fail_after: Option<usize>,
}

impl Read for ScriptedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(d) = self.delay {
            thread::sleep(d);
        }
        let mut limit = self.data.len();
        if let Some(n) = self.fail_after {
            if self.pos >= n {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset mid-body",
                ));
            }
            limit = limit.min(n);
        }
        let n = buf.len().min(self.read_size).min(limit - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Deterministic test payload: bytes cycle through 0..251 (prime, so ranges
/// never line up with the pattern by accident).
pub(crate) fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
