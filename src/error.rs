//! Error types used by the procvisor runtime and behaviors.
//!
//! - [`SpawnError`]: a process could not be started (reported synchronously to the spawner).
//! - [`EventError`]: event registration, subscription or publishing was rejected.
//! - [`SendError`] / [`CallError`]: message delivery to another process failed.
//! - [`HandlerError`]: returned by behavior callbacks; turns into an abnormal exit.
//! - [`RuntimeError`]: failures surfaced by the runtime itself (shutdown, root failure).
//!
//! Every enum provides `as_label` with a short stable snake_case label for logs/metrics.

use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;

use crate::core::{ExitReason, ProcessId};

/// # Errors produced while spawning a process.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// Another live process already holds the requested name.
    #[error("name {name:?} is already registered by {holder}")]
    NameTaken {
        /// Requested name.
        name: String,
        /// Process currently holding the name.
        holder: ProcessId,
    },

    /// The behavior's `init` returned an error.
    #[error("process {name:?} failed to initialize: {reason}")]
    InitFailed {
        /// Name (or pid) of the process that failed.
        name: String,
        /// Error reported by `init`.
        reason: String,
    },

    /// The behavior's `init` panicked.
    #[error("process {name:?} panicked during init: {reason}")]
    InitPanicked {
        /// Name (or pid) of the process that failed.
        name: String,
        /// Panic message.
        reason: String,
    },

    /// The runtime is shutting down and no longer accepts new processes.
    #[error("runtime is closed")]
    RuntimeClosed,
}

impl SpawnError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::SpawnError;
    ///
    /// assert_eq!(SpawnError::RuntimeClosed.as_label(), "spawn_runtime_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::NameTaken { .. } => "spawn_name_taken",
            SpawnError::InitFailed { .. } => "spawn_init_failed",
            SpawnError::InitPanicked { .. } => "spawn_init_panicked",
            SpawnError::RuntimeClosed => "spawn_runtime_closed",
        }
    }
}

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The event name is registered by another live producer.
    #[error("event {event:?} is already registered by {owner}")]
    RegistrationConflict {
        /// Event name.
        event: String,
        /// Current producer.
        owner: ProcessId,
    },

    /// No live producer has registered this event name.
    #[error("unknown event {event:?}")]
    UnknownEvent {
        /// Event name.
        event: String,
    },

    /// The caller is not the registered producer of this event.
    #[error("process {caller} is not the producer of event {event:?}")]
    NotOwner {
        /// Event name.
        event: String,
        /// Process that attempted the operation.
        caller: ProcessId,
    },

    /// The process acting on the bus is not live (unknown, stopping or terminated).
    #[error("process {pid} is not live")]
    NoProcess {
        /// Acting pid.
        pid: ProcessId,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::RegistrationConflict { .. } => "event_registration_conflict",
            EventError::UnknownEvent { .. } => "event_unknown",
            EventError::NotOwner { .. } => "event_not_owner",
            EventError::NoProcess { .. } => "event_no_process",
        }
    }
}

/// # Error returned when an asynchronous message cannot be delivered.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Target process does not exist (never existed or already terminated).
    #[error("no such process {pid}")]
    NoProcess {
        /// Target pid.
        pid: ProcessId,
    },
}

impl SendError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SendError::NoProcess { .. } => "send_no_process",
        }
    }
}

/// # Errors returned by synchronous calls.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Target process does not exist.
    #[error("no such process {pid}")]
    NoProcess {
        /// Target pid.
        pid: ProcessId,
    },

    /// No reply arrived within the timeout.
    #[error("call to {pid} timed out after {timeout:?}")]
    Timeout {
        /// Target pid.
        pid: ProcessId,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The server dropped the request without replying (it failed or terminated).
    #[error("process {pid} terminated without replying")]
    NoReply {
        /// Target pid.
        pid: ProcessId,
    },

    /// The reply did not have the type the caller expected.
    #[error("process {pid} replied with {got}, expected {expected}")]
    UnexpectedReply {
        /// Target pid.
        pid: ProcessId,
        /// Type name the caller expected.
        expected: &'static str,
        /// Type name of the payload actually received.
        got: &'static str,
    },
}

impl CallError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::NoProcess { .. } => "call_no_process",
            CallError::Timeout { .. } => "call_timeout",
            CallError::NoReply { .. } => "call_no_reply",
            CallError::UnexpectedReply { .. } => "call_unexpected_reply",
        }
    }
}

impl From<SendError> for CallError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::NoProcess { pid } => CallError::NoProcess { pid },
        }
    }
}

/// # Errors returned by behavior callbacks.
///
/// Returning an error from `init` fails the spawn; returning one from a message
/// handler stops the process with [`ExitReason::Failure`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler failed; the supervisor may restart the process.
    #[error("handler failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Handler hit an unrecoverable condition.
    #[error("fatal error: {reason}")]
    Fatal {
        /// The underlying error message.
        reason: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(reason: impl Display) -> Self {
        HandlerError::Fail {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`HandlerError::Fatal`].
    pub fn fatal(reason: impl Display) -> Self {
        HandlerError::Fatal {
            reason: reason.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::HandlerError;
    ///
    /// assert_eq!(HandlerError::fail("boom").as_label(), "handler_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Fatal { .. } => "handler_fatal",
        }
    }

    /// Returns the bare error message.
    pub fn reason(&self) -> &str {
        match self {
            HandlerError::Fail { reason } | HandlerError::Fatal { reason } => reason,
        }
    }
}

impl From<EventError> for HandlerError {
    fn from(err: EventError) -> Self {
        HandlerError::fail(err)
    }
}

impl From<SendError> for HandlerError {
    fn from(err: SendError) -> Self {
        HandlerError::fail(err)
    }
}

impl From<CallError> for HandlerError {
    fn from(err: CallError) -> Self {
        HandlerError::fail(err)
    }
}

/// # Errors produced by the runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some processes were still alive.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Processes (name or pid) that did not terminate in time.
        stuck: Vec<String>,
    },

    /// The root process terminated abnormally (e.g. restart budget exhausted at the top).
    #[error("root process {process} failed: {reason}")]
    RootFailed {
        /// Name (or pid) of the root process.
        process: String,
        /// Exit reason of the root.
        reason: ExitReason,
    },

    /// The root process could not be spawned.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Installing OS signal handlers failed.
    #[error("signal handler registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::RootFailed { .. } => "runtime_root_failed",
            RuntimeError::Spawn(_) => "runtime_spawn_failed",
            RuntimeError::Signal(_) => "runtime_signal_failed",
        }
    }
}
