//! # Fibonacci Backoff
//!
//! Progressive delay for restarting the source watch after throttling or
//! unexpected errors. Grows more slowly than exponential backoff, so a flapping
//! API server is not hammered but recovery is still quick.
//!
//! ## Usage
//!
//! ```rust
//! use catalog_sync_controller::controller::backoff::FibonacciBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(3));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at the maximum.
/// Calculations are performed in milliseconds.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in milliseconds (for reset)
    min_ms: u64,
    /// Previous backoff value in milliseconds
    prev_ms: u64,
    /// Current backoff value in milliseconds
    current_ms: u64,
    /// Maximum backoff value in milliseconds
    max_ms: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff between `min` and `max`
    ///
    /// A `max` below `min` is raised to `min`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX).max(1);
        let max_ms = u64::try_from(max.as_millis())
            .unwrap_or(u64::MAX)
            .max(min_ms);
        Self {
            min_ms,
            prev_ms: 0,
            current_ms: min_ms,
            max_ms,
        }
    }

    /// Get the next backoff duration in milliseconds and advance the sequence
    pub fn next_backoff_ms(&mut self) -> u64 {
        let result_ms = self.current_ms;

        let next_ms = self.prev_ms.saturating_add(self.current_ms);
        self.prev_ms = self.current_ms;
        self.current_ms = std::cmp::min(next_ms, self.max_ms);

        result_ms
    }

    /// Get the next backoff duration and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_ms())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_ms = 0;
        self.current_ms = self.min_ms;
    }
}
