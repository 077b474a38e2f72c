//! # Rolling restart budget.
//!
//! [`RestartIntensity`] remembers when the recent restarts of one supervisor
//! happened. A restart is admitted while fewer than `max_restarts` restarts fall
//! inside the trailing `period`; otherwise the supervisor must escalate.
//!
//! ```text
//! max_restarts = 3, period = 5s
//!
//! t=0s  t=1s  t=2s        → admitted (3 in window)
//! t=3s                    → rejected (window still holds 3)
//! t=5.5s                  → admitted (t=0s fell out of the window)
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Restart history of a single supervisor.
#[derive(Debug, Clone)]
pub struct RestartIntensity {
    max_restarts: u32,
    period: Duration,
    history: VecDeque<Instant>,
}

impl RestartIntensity {
    pub fn new(max_restarts: u32, period: Duration) -> Self {
        Self {
            max_restarts,
            period,
            history: VecDeque::with_capacity(max_restarts as usize),
        }
    }

    /// Records a restart at `now` if the budget allows it.
    ///
    /// Returns `false` (and records nothing) when the budget is exhausted.
    pub fn try_record(&mut self, now: Instant) -> bool {
        self.prune(now);
        if self.history.len() >= self.max_restarts as usize {
            return false;
        }
        self.history.push_back(now);
        true
    }

    /// Number of restarts inside the window ending at `now`.
    pub fn in_window(&mut self, now: Instant) -> u32 {
        self.prune(now);
        self.history.len() as u32
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.history.front() {
            if now.duration_since(oldest) >= self.period {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }
}
