//! Polling-with-timeout.
//!
//! Every Locate and assertion in Vitrine re-probes the page on a fixed
//! interval until it succeeds or a deadline elapses. Nothing assumes the DOM
//! is settled after an action.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default per-action polling deadline (4 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 4_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default navigation deadline (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Start a polling deadline from now
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::start(*self)
    }
}

// =============================================================================
// DEADLINE
// =============================================================================

/// Polling clock for one bounded wait.
///
/// Callers probe first, then call [`Deadline::next_poll`]; the probe always
/// runs at least once even with a zero timeout.
///
/// ```ignore
/// let mut deadline = options.deadline();
/// loop {
///     if probe().await? { break; }
///     if !deadline.next_poll().await { return Err(timeout) }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Deadline {
    options: WaitOptions,
    started: Instant,
    polls: u32,
}

impl Deadline {
    /// Start a deadline now
    #[must_use]
    pub fn start(options: WaitOptions) -> Self {
        Self {
            options,
            started: Instant::now(),
            polls: 0,
        }
    }

    /// Time spent so far
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of probes that were followed by a sleep
    #[must_use]
    pub const fn polls(&self) -> u32 {
        self.polls
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.options.timeout()
    }

    /// Sleep until the next probe; returns `false` once the deadline is spent.
    ///
    /// The final sleep is clipped so that one last probe lands on the deadline.
    pub async fn next_poll(&mut self) -> bool {
        let timeout = self.options.timeout();
        let elapsed = self.elapsed();
        if elapsed >= timeout {
            return false;
        }
        let remaining = timeout - elapsed;
        tokio::time::sleep(self.options.poll_interval().min(remaining)).await;
        self.polls += 1;
        true
    }

    /// The options this deadline runs under
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }
}
