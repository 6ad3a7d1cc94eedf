//! Fixed-window request throttle.
//!
//! Admits at most `requests` acquisitions per `window`. The window starts at
//! the first admitted request and resets once it has fully elapsed.
//! [`RequestThrottle::try_acquire`] is pure over an explicit instant;
//! [`RequestThrottle::acquire`] sleeps on the tokio timer until admitted.

use std::time::{Duration, Instant};

use tracing::debug;
use waymark_settings::ThrottleSettings;

/// Requests-per-window bucket.
#[derive(Clone, Debug)]
pub struct RequestThrottle {
    requests: u32,
    window: Duration,
    window_start: Option<Instant>,
    used: u32,
}

impl RequestThrottle {
    /// A throttle admitting `requests` per `window`. `requests` is clamped
    /// to at least 1.
    pub fn new(requests: u32, window: Duration) -> Self {
        Self {
            requests: requests.max(1),
            window,
            window_start: None,
            used: 0,
        }
    }

    /// Build from settings.
    pub fn from_settings(settings: &ThrottleSettings) -> Self {
        Self::new(settings.requests, Duration::from_millis(settings.window_ms))
    }

    /// Admit a request at `now`, or report how long until the window resets.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        match self.window_start {
            Some(start) if now.saturating_duration_since(start) < self.window => {
                if self.used < self.requests {
                    self.used += 1;
                    Ok(())
                } else {
                    Err(self.window - now.saturating_duration_since(start))
                }
            }
            _ => {
                self.window_start = Some(now);
                self.used = 1;
                Ok(())
            }
        }
    }

    /// Wait until a request is admitted.
    pub async fn acquire(&mut self) {
        loop {
            match self.try_acquire(Instant::now()) {
                Ok(()) => return,
                Err(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "throttled");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Requests left in the current window as of `now`.
    pub fn remaining(&self, now: Instant) -> u32 {
        match self.window_start {
            Some(start) if now.saturating_duration_since(start) < self.window => {
                self.requests - self.used
            }
            _ => self.requests,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
