//! # Exit reasons and process status.
//!
//! [`ExitReason`] travels with every termination: to the terminate hook, to the
//! parent supervisor (as [`Message::Exit`](crate::Message::Exit)), and to event
//! subscribers when a producer dies.
//!
//! ## Normal vs abnormal
//! ```text
//! Normal, Shutdown                           → clean (Transient children stay down)
//! Kill, Failure, Escalation, Custom          → abnormal (Transient children restart)
//! ```

use std::fmt;
use std::sync::Arc;

/// Why a process terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The process decided to stop.
    Normal,
    /// Stopped by its parent or by runtime shutdown.
    Shutdown,
    /// Forcefully stopped.
    Kill,
    /// A handler returned an error or panicked.
    Failure(Arc<str>),
    /// A supervisor exhausted its restart budget.
    Escalation(Arc<str>),
    /// Any other, user-defined reason (treated as abnormal).
    Custom(Arc<str>),
}

impl ExitReason {
    /// Creates a [`ExitReason::Failure`].
    pub fn failure(msg: impl Into<Arc<str>>) -> Self {
        ExitReason::Failure(msg.into())
    }

    /// Creates a [`ExitReason::Custom`].
    pub fn custom(msg: impl Into<Arc<str>>) -> Self {
        ExitReason::Custom(msg.into())
    }

    /// True for every reason except `Normal` and `Shutdown`.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ExitReason::Normal | ExitReason::Shutdown)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExitReason::Normal => "normal",
            ExitReason::Shutdown => "shutdown",
            ExitReason::Kill => "kill",
            ExitReason::Failure(_) => "failure",
            ExitReason::Escalation(_) => "escalation",
            ExitReason::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => f.write_str("normal"),
            ExitReason::Shutdown => f.write_str("shutdown"),
            ExitReason::Kill => f.write_str("kill"),
            ExitReason::Failure(msg) => write!(f, "failure: {msg}"),
            ExitReason::Escalation(msg) => write!(f, "escalation: {msg}"),
            ExitReason::Custom(msg) => f.write_str(msg),
        }
    }
}

/// Lifecycle state of a process.
///
/// ```text
/// Starting ──init ok──► Running ──stop──► Stopping ──terminate──► Terminated
///    └──────────────init failed──────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Starting,
    Running,
    Stopping,
    Terminated,
}

impl ProcessStatus {
    pub fn is_terminated(&self) -> bool {
        matches!(self, ProcessStatus::Terminated)
    }

    /// `Starting` or `Running`: the process may still own names and subscriptions.
    pub fn is_live(&self) -> bool {
        matches!(self, ProcessStatus::Starting | ProcessStatus::Running)
    }
}
