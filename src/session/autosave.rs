//! Debounce timer for auto-save.
//!
//! The timer holds a deadline only; whoever drives the session compares it
//! against the clock. Times are [`tokio::time::Instant`] so paused-clock
//! tests advance it deterministically.

use std::time::Duration;
use tokio::time::Instant;

/// Cancelable, re-armable deadline.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// Creates a disarmed timer with the given delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// The configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)starts the countdown from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Stops the countdown.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// The pending deadline, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the timer is armed and its deadline has passed.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearm_pushes_deadline() {
        let start = Instant::now();
        let mut timer = DebounceTimer::new(Duration::from_millis(100));
        assert!(!timer.is_due(start));

        timer.arm(start);
        assert!(!timer.is_due(start + Duration::from_millis(50)));
        timer.arm(start + Duration::from_millis(50));
        assert!(!timer.is_due(start + Duration::from_millis(120)));
        assert!(timer.is_due(start + Duration::from_millis(150)));

        timer.cancel();
        assert!(!timer.is_due(start + Duration::from_secs(10)));
    }
}
