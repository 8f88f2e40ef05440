//! Poll coalescing for concurrent metric scrapes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

/// Collapses concurrent refresh attempts into one device poll.
///
/// Prometheus servers retry and overlap scrapes, and the modem's embedded
/// HTTP stack handles one slow request at a time. Callers that arrive while
/// a refresh is in flight wait for it and reuse its readings instead of
/// queueing their own polls. A failed refresh does not advance the
/// generation, so the next caller polls again rather than reusing nothing.
pub struct RefreshCoalescer {
    generation: AtomicU64,
    gate: Mutex<()>,
}

impl RefreshCoalescer {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
        }
    }

    /// Run `refresh` unless a concurrent caller already completed one.
    ///
    /// Returns whether this caller performed the refresh itself; `false`
    /// means a refresh finished while we waited at the gate and its result
    /// is already visible.
    pub async fn run<F, Fut, E>(&self, refresh: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let seen = self.generation.load(Ordering::Acquire);
        let _gate = self.gate.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            return Ok(false);
        }
        refresh().await?;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(true)
    }
}

impl Default for RefreshCoalescer {
    fn default() -> Self {
        Self::new()
    }
}
