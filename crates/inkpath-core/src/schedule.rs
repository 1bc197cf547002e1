//! Rate limiting for throttled recomputation.

use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Coalesces requests so the guarded work runs at most once per interval.
///
/// A request that arrives too early is remembered as pending; the caller
/// either serves it when the gesture ends or cancels it.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_run: Option<Instant>,
    pending: bool,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_run: None,
            pending: false,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Ask to run the work at `now`. Returns true if it may run immediately;
    /// otherwise the request is marked pending.
    pub fn request(&mut self, now: Instant) -> bool {
        let ready = match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if ready {
            self.last_run = Some(now);
            self.pending = false;
        } else {
            self.pending = true;
        }
        ready
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Drop any pending request and forget the last run.
    pub fn cancel(&mut self) {
        self.pending = false;
        self.last_run = None;
    }
}
