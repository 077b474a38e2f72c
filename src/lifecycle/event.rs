//! # Lifecycle events emitted by the runtime.
//!
//! These are observability records, not messages between processes (those go
//! through the [`EventBus`](crate::EventBus)). They describe what the runtime
//! did: spawned a process, restarted a child, gave up on a subtree, and so on.
//!
//! ## Ordering guarantees
//! Each record has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when records are
//! consumed out of order.
//!
//! ## Example
//! ```rust
//! use procvisor::{LifecycleEvent, LifecycleKind};
//!
//! let ev = LifecycleEvent::new(LifecycleKind::ChildRestarted)
//!     .with_process("consumerWorkersSup")
//!     .with_child("cons02")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, LifecycleKind::ChildRestarted);
//! assert_eq!(ev.child.as_deref(), Some("cons02"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::ProcessId;

/// Global sequence counter for lifecycle ordering.
static LIFECYCLE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    // === Process events ===
    /// Process passed `init` and is running.
    ///
    /// Sets: `pid`, `process`, `parent`
    ProcessSpawned,

    /// Process failed `init` (spawn error reported to the spawner).
    ///
    /// Sets: `pid`, `process`, `reason`
    ProcessInitFailed,

    /// Process ran its terminate hook and left the registry.
    ///
    /// Sets: `pid`, `process`, `parent`, `reason`
    ProcessTerminated,

    // === Supervision events ===
    /// Supervisor restarted a child (or a group of children starting at it).
    ///
    /// Sets: `process` (supervisor), `child`, `attempt` (restarts in window), `reason`
    ChildRestarted,

    /// Supervisor exceeded its restart intensity and is escalating.
    ///
    /// Sets: `process` (supervisor), `child`, `reason`
    RestartIntensityExceeded,

    // === Event bus ===
    /// A producer registered an event name.
    ///
    /// Sets: `pid` (producer), `event`
    EventRegistered,

    /// An event name was dropped (explicit unregister or producer death).
    ///
    /// Sets: `pid` (producer), `event`, `reason`
    EventUnregistered,

    // === Shutdown events ===
    /// Shutdown requested (OS signal or explicit `Runtime::shutdown`).
    ShutdownRequested,

    /// All processes stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some processes did not stop in time.
    ///
    /// Sets: `reason` (stuck processes)
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `process` (subscriber name), `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `process` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Lifecycle record with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`LifecycleKind`]
#[derive(Clone, Debug)]
pub struct LifecycleEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: LifecycleKind,
    /// Process the record is about.
    pub pid: Option<ProcessId>,
    /// Name (or printable pid) of the process.
    pub process: Option<Arc<str>>,
    /// Parent of the process, if any.
    pub parent: Option<ProcessId>,
    /// Child name (supervision records).
    pub child: Option<Arc<str>>,
    /// Event name (event bus records).
    pub event: Option<Arc<str>>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Restart count within the current window.
    pub attempt: Option<u32>,
}

impl LifecycleEvent {
    /// Creates a new record of the given kind with current timestamp and next sequence number.
    pub fn new(kind: LifecycleKind) -> Self {
        Self {
            seq: LIFECYCLE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            process: None,
            parent: None,
            child: None,
            event: None,
            reason: None,
            attempt: None,
        }
    }

    #[inline]
    pub fn with_pid(mut self, pid: ProcessId) -> Self {
        self.pid = Some(pid);
        self
    }

    #[inline]
    pub fn with_process(mut self, process: impl Into<Arc<str>>) -> Self {
        self.process = Some(process.into());
        self
    }

    #[inline]
    pub fn with_parent(mut self, parent: Option<ProcessId>) -> Self {
        self.parent = parent;
        self
    }

    #[inline]
    pub fn with_child(mut self, child: impl Into<Arc<str>>) -> Self {
        self.child = Some(child.into());
        self
    }

    #[inline]
    pub fn with_event(mut self, event: impl Into<Arc<str>>) -> Self {
        self.event = Some(event.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow record.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        LifecycleEvent::new(LifecycleKind::SubscriberOverflow)
            .with_process(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic record.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        LifecycleEvent::new(LifecycleKind::SubscriberPanicked)
            .with_process(subscriber)
            .with_reason(info)
    }
}
