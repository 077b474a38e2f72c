//! # Supervisor strategies.
//!
//! [`StrategyKind`] picks which children are touched when one of them must be
//! restarted; [`SupervisorStrategy`] adds the restart budget and defaults.
//!
//! ```text
//! children: [A, B, C]      B terminated abnormally
//!
//! OneForOne   → restart B
//! OneForAll   → stop C, A; start A, B, C
//! RestForOne  → stop C;    start B, C       (A untouched)
//! ```

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Which siblings are affected by a restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Only the terminated child is restarted.
    #[default]
    OneForOne,
    /// Every child is stopped and the whole set respawned in declaration order.
    OneForAll,
    /// The terminated child and every child declared after it are restarted.
    RestForOne,
}

impl StrategyKind {
    /// Indices affected when the child at `failed` must restart, in declaration order.
    pub fn affected(&self, failed: usize, len: usize) -> std::ops::Range<usize> {
        match self {
            StrategyKind::OneForOne => failed..failed + 1,
            StrategyKind::OneForAll => 0..len,
            StrategyKind::RestForOne => failed..len,
        }
    }
}

/// Restart strategy of a supervisor.
///
/// - `kind`: which children restart together
/// - `max_restarts` / `period`: at most `max_restarts` restarts in any trailing `period`;
///   the next one makes the supervisor give up and terminate with
///   [`ExitReason::Escalation`](crate::ExitReason::Escalation)
/// - `restart`: default policy for children that don't set their own
/// - `backoff`: optional delay before each restart (`None` = restart immediately)
#[derive(Clone, Copy, Debug)]
pub struct SupervisorStrategy {
    pub kind: StrategyKind,
    pub max_restarts: u32,
    pub period: Duration,
    pub restart: RestartPolicy,
    pub backoff: Option<BackoffPolicy>,
}

impl SupervisorStrategy {
    /// Creates a strategy with the given kind and budget, `Permanent` children and no backoff.
    pub fn new(kind: StrategyKind, max_restarts: u32, period: Duration) -> Self {
        Self {
            kind,
            max_restarts,
            period,
            restart: RestartPolicy::Permanent,
            backoff: None,
        }
    }

    /// Returns a new strategy with updated default restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new strategy that waits before each restart.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

impl Default for SupervisorStrategy {
    /// `OneForOne`, 3 restarts per 5 seconds, `Permanent`, no backoff.
    fn default() -> Self {
        Self::new(StrategyKind::OneForOne, 3, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affected_ranges_follow_declaration_order() {
        assert_eq!(StrategyKind::OneForOne.affected(1, 3), 1..2);
        assert_eq!(StrategyKind::OneForAll.affected(1, 3), 0..3);
        assert_eq!(StrategyKind::RestForOne.affected(1, 3), 1..3);
        assert_eq!(StrategyKind::RestForOne.affected(2, 3), 2..3);
    }
}
