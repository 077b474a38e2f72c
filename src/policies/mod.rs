//! Supervision policies.
//!
//! This module groups the knobs that control **whether**, **which** and **how
//! fast** children are restarted.
//!
//! ## Contents
//! - [`RestartPolicy`] whether a terminated child comes back (permanent / transient / temporary)
//! - [`StrategyKind`], [`SupervisorStrategy`] which siblings restart together, and the budget
//! - [`RestartIntensity`] rolling window enforcing `max_restarts` per `period`
//! - [`BackoffPolicy`], [`JitterPolicy`] optional delay before restarts
//!
//! ## Quick wiring
//! ```text
//! SupervisorSpec { strategy: SupervisorStrategy, children: [ChildSpec { restart: Option<RestartPolicy> }] }
//!      └─► Supervisor uses:
//!           - restart.should_restart(reason) to decide
//!           - intensity.try_record(now) to admit or escalate
//!           - kind.affected(idx, len) to pick the group
//!           - backoff.delay(restarts_in_window) to pace
//! ```

mod backoff;
mod intensity;
mod jitter;
mod restart;
mod strategy;

pub use backoff::BackoffPolicy;
pub use intensity::RestartIntensity;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
pub use strategy::{StrategyKind, SupervisorStrategy};
