//! libcurl-backed [`Transport`].
//!
//! Each request runs `Easy2::perform` on its own thread. The handler forwards
//! the final response head and every body chunk through a bounded channel, so
//! callers consume the body through plain `Read`. Dropping the body raises the
//! abort flag and closes the channel; libcurl stops at the next write or
//! progress callback and the transfer thread is joined.

use std::io::{self, Read};
use std::str;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use curl::easy::{Easy2, Handler, List, WriteError};

use super::{Headers, Method, Request, Response, Transport, TransportError};

/// Chunks buffered between the transfer thread and the reader.
const CHANNEL_DEPTH: usize = 16;

/// Connection settings applied to every request.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub user_agent: Option<String>,
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub follow_redirects: bool,
    /// Extra request headers (e.g. cookies or auth tokens supplied by the user).
    pub headers: Vec<(String, String)>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            user_agent: Some(format!("pdl/{}", env!("CARGO_PKG_VERSION"))),
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            follow_redirects: true,
            headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    fn configure(
        &self,
        request: &Request,
        handler: StreamHandler,
    ) -> Result<Easy2<StreamHandler>, curl::Error> {
        let opts = &self.options;
        let mut easy = Easy2::new(handler);
        easy.url(&request.url)?;
        match request.method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
        }
        easy.follow_location(opts.follow_redirects)?;
        if opts.follow_redirects {
            easy.max_redirections(10)?;
        }
        easy.connect_timeout(opts.connect_timeout)?;
        easy.low_speed_limit(opts.low_speed_limit)?;
        easy.low_speed_time(opts.low_speed_time)?;
        // Progress callbacks let a dropped body abort an idle transfer.
        easy.progress(true)?;
        if let Some(ua) = &opts.user_agent {
            easy.useragent(ua)?;
        }
        // curl expects "start-end" and adds the "bytes=" unit itself.
        if let Some((start, end)) = request.range {
            easy.range(&format!("{}-{}", start, end))?;
        }
        if !opts.headers.is_empty() {
            let mut list = List::new();
            for (k, v) in &opts.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
        let abort = Arc::new(AtomicBool::new(false));
        let easy = self.configure(request, StreamHandler::new(tx, Arc::clone(&abort)))?;

        let handle = thread::Builder::new()
            .name("pdl-transfer".to_string())
            .spawn(move || run_transfer(easy))?;

        let mut body = CurlBody {
            rx: Some(rx),
            abort,
            handle: Some(handle),
            pending: Vec::new(),
            pos: 0,
            finished: false,
        };

        match body.next_event() {
            Some(Event::Head { status, headers }) => {
                tracing::trace!(url = %request.url, status, "response head received");
                Ok(Response {
                    status,
                    headers,
                    body: Box::new(body),
                })
            }
            Some(Event::Done(Err(e))) => Err(TransportError::Curl(e)),
            _ => Err(TransportError::NoResponse),
        }
    }
}

enum Event {
    Head { status: u32, headers: Headers },
    Data(Vec<u8>),
    Done(Result<(), curl::Error>),
}

fn run_transfer(mut easy: Easy2<StreamHandler>) {
    let result = easy.perform();
    if !easy.get_ref().head_sent && result.is_ok() {
        // Bodiless response (HEAD, 204, empty 200): the head was never forwarded.
        if easy.get_ref().status == 0 {
            if let Ok(code) = easy.response_code() {
                easy.get_mut().status = code;
            }
        }
        easy.get_mut().send_head();
    }
    let _ = easy.get_ref().tx.send(Event::Done(result));
}

struct StreamHandler {
    tx: SyncSender<Event>,
    abort: Arc<AtomicBool>,
    status: u32,
    headers: Headers,
    head_sent: bool,
}

impl StreamHandler {
    fn new(tx: SyncSender<Event>, abort: Arc<AtomicBool>) -> Self {
        Self {
            tx,
            abort,
            status: 0,
            headers: Headers::new(),
            head_sent: false,
        }
    }

    fn send_head(&mut self) -> bool {
        if self.head_sent {
            return true;
        }
        self.head_sent = true;
        let event = Event::Head {
            status: self.status,
            headers: std::mem::take(&mut self.headers),
        };
        self.tx.send(event).is_ok()
    }
}

impl Handler for StreamHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(line) = str::from_utf8(data) {
            let line = line.trim_end();
            if line.starts_with("HTTP/") {
                // A new response block (redirect hop or 1xx); only the last one counts.
                self.headers.clear();
                self.status = parse_status_line(line).unwrap_or(0);
            } else {
                self.headers.push_line(line);
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.abort.load(Ordering::Relaxed) || !self.send_head() {
            return Ok(0);
        }
        match self.tx.send(Event::Data(data.to_vec())) {
            Ok(()) => Ok(data.len()),
            Err(_) => Ok(0),
        }
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.abort.load(Ordering::Relaxed)
    }
}

/// `HTTP/1.1 206 Partial Content` -> 206.
fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

struct CurlBody {
    rx: Option<Receiver<Event>>,
    abort: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl CurlBody {
    fn next_event(&mut self) -> Option<Event> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Read for CurlBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.pending.len() {
                let n = buf.len().min(self.pending.len() - self.pos);
                buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            match self.next_event() {
                Some(Event::Data(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Some(Event::Head { .. }) => continue,
                Some(Event::Done(Ok(()))) => {
                    self.finished = true;
                    return Ok(0);
                }
                Some(Event::Done(Err(e))) => {
                    self.finished = true;
                    return Err(io::Error::new(io::ErrorKind::Other, e));
                }
                None => {
                    self.finished = true;
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transfer thread exited without completing",
                    ));
                }
            }
        }
    }
}

impl Drop for CurlBody {
    fn drop(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
        drop(self.rx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("curl transfer thread panicked");
            }
        }
    }
}
