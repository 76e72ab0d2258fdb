//! Cooperative cancellation shared between the coordinator and its workers.
//!
//! A token is a shared flag. Workers poll it between chunk reads; nothing is
//! interrupted mid-read. Child tokens observe their parent, so a caller's
//! token (e.g. Ctrl-C in the CLI) reaches the workers of a download while the
//! coordinator can still cancel its own run without touching the caller's flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is canceled when either it or `self` is canceled.
    pub fn child(&self) -> CancelToken {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self.parent.as_ref().is_some_and(|p| p.is_canceled())
    }
}
