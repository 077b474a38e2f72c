//! # Runtime configuration.
//!
//! Provides [`RuntimeConfig`], the settings shared by every process of one
//! [`Runtime`](crate::Runtime).
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for processes during shutdown
//! - `call_timeout = 0s` → synchronous calls wait indefinitely
//! - `lifecycle_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::SupervisorStrategy;

/// Global configuration for the runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait for processes to stop during shutdown
/// - `lifecycle_capacity`: ring buffer size of the lifecycle broadcast
/// - `call_timeout`: default timeout of `call` (`0s` = none)
/// - `default_strategy`: used by supervisors whose `SupervisorSpec` sets no strategy
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Maximum time to wait for graceful shutdown.
    ///
    /// When shutdown starts, every root process is stopped with
    /// [`ExitReason::Shutdown`](crate::ExitReason::Shutdown); if some process is
    /// still alive after `grace`, shutdown returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the lifecycle broadcast channel.
    ///
    /// Receivers lagging by more than this many records skip older ones.
    pub lifecycle_capacity: usize,

    /// Default timeout of synchronous calls.
    pub call_timeout: Duration,

    /// Strategy applied by supervisors that don't declare their own.
    pub default_strategy: SupervisorStrategy,
}

impl RuntimeConfig {
    /// Returns the lifecycle capacity clamped to a minimum of 1.
    #[inline]
    pub fn lifecycle_capacity_clamped(&self) -> usize {
        self.lifecycle_capacity.max(1)
    }

    /// Returns the default call timeout as an `Option` (`None` = wait forever).
    #[inline]
    pub fn default_call_timeout(&self) -> Option<Duration> {
        if self.call_timeout == Duration::ZERO {
            None
        } else {
            Some(self.call_timeout)
        }
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `grace = 60s`
    /// - `lifecycle_capacity = 1024`
    /// - `call_timeout = 5s`
    /// - `default_strategy = SupervisorStrategy::default()` (one-for-one, 3 restarts / 5s)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            lifecycle_capacity: 1024,
            call_timeout: Duration::from_secs(5),
            default_strategy: SupervisorStrategy::default(),
        }
    }
}
