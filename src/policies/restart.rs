//! # Restart policies for supervised children.
//!
//! [`RestartPolicy`] decides whether a terminated child comes back:
//!
//! ```text
//! RestartPolicy::Permanent  → always restarted, even after a clean stop
//! RestartPolicy::Transient  → restarted only after an abnormal exit
//! RestartPolicy::Temporary  → never restarted
//! ```
//!
//! "Abnormal" is anything but [`ExitReason::Normal`] and [`ExitReason::Shutdown`].

use crate::core::ExitReason;

/// Policy controlling whether a child is restarted after it terminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Always restart, regardless of the exit reason (default).
    #[default]
    Permanent,
    /// Restart only if the child exited abnormally.
    Transient,
    /// Never restart.
    Temporary,
}

impl RestartPolicy {
    /// True if a child that exited with `reason` must be restarted.
    pub fn should_restart(&self, reason: &ExitReason) -> bool {
        match self {
            RestartPolicy::Permanent => true,
            RestartPolicy::Transient => reason.is_abnormal(),
            RestartPolicy::Temporary => false,
        }
    }
}
