//! # Process identifiers.
//!
//! Identifiers come from a single process-wide counter, so a [`ProcessId`] is
//! never reassigned, even after its process terminated or the runtime that
//! created it was dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global allocator for process ids (0 is never handed out).
static NEXT_PID: AtomicU64 = AtomicU64::new(1);

/// Opaque, unique process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Allocates the next identifier.
    pub(crate) fn next() -> Self {
        ProcessId(NEXT_PID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        ProcessId(raw)
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}>", self.0)
    }
}
