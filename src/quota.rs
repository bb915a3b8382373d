use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds.
///
/// Injected so the fixed-window algorithm can be tested with a controlled
/// clock instead of sleeping through real windows.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// One identity's request counter for the current window
#[derive(Debug, Clone)]
struct QuotaWindow {
    count: u32,
    reset_at_ms: u64,
}

/// Per-identity fixed-window rate limiter
///
/// Each identity gets `limit` admitted requests per `window_ms` window.
/// Windows are created lazily on first request and replaced lazily on the
/// first request after expiry; nothing is ever deleted. State is in-memory
/// only and does not survive a restart.
pub struct QuotaTracker {
    windows: Mutex<HashMap<String, QuotaWindow>>,
    limit: u32,
    window_ms: u64,
    clock: Box<dyn Clock>,
}

impl QuotaTracker {
    /// Create a tracker using the wall clock
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self::with_clock(limit, window_ms, Box::new(SystemClock))
    }

    /// Create a tracker with an injected clock (used by tests)
    pub fn with_clock(limit: u32, window_ms: u64, clock: Box<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window_ms,
            clock,
        }
    }

    /// Admitted requests allowed per window
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Decide whether a request from `identity` is admitted.
    ///
    /// The read-modify-write happens under the map lock, so two concurrent
    /// requests for the same identity cannot both observe `count < limit`
    /// and slip past the cap together.
    pub fn admit(&self, identity: &str) -> bool {
        let now = self.clock.now_ms();
        let mut windows = self.windows.lock().unwrap();

        if let Some(window) = windows.get_mut(identity) {
            // `now >= reset_at` starts a fresh window, so a request arriving
            // exactly at the boundary counts against the next window.
            if now < window.reset_at_ms {
                if window.count >= self.limit {
                    return false;
                }
                window.count += 1;
                return true;
            }
            window.count = 1;
            window.reset_at_ms = now + self.window_ms;
            return true;
        }

        windows.insert(
            identity.to_string(),
            QuotaWindow {
                count: 1,
                reset_at_ms: now + self.window_ms,
            },
        );
        true
    }
}
