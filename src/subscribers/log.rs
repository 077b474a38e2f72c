//! # Logging subscriber.
//!
//! [`LogWriter`] renders lifecycle records through `tracing`, so they end up
//! wherever the application's subscriber sends logs.
//!
//! ## Levels
//! ```text
//! ProcessSpawned, EventRegistered, EventUnregistered        → debug
//! ProcessTerminated (clean), ChildRestarted, shutdown       → info
//! ProcessTerminated (abnormal), ProcessInitFailed, overflow → warn
//! RestartIntensityExceeded, GraceExceeded, SubscriberPanic  → error
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{LifecycleEvent, LifecycleKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards lifecycle records to `tracing`.
///
/// Enabled via the `logging` feature (on by default).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &LifecycleEvent) {
        let process = e.process.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            LifecycleKind::ProcessSpawned => {
                debug!(process, pid = ?e.pid, parent = ?e.parent, "process spawned");
            }
            LifecycleKind::ProcessInitFailed => {
                warn!(process, pid = ?e.pid, reason, "process failed to initialize");
            }
            LifecycleKind::ProcessTerminated => {
                if matches!(reason, "normal" | "shutdown") {
                    info!(process, pid = ?e.pid, reason, "process terminated");
                } else {
                    warn!(process, pid = ?e.pid, reason, "process terminated abnormally");
                }
            }
            LifecycleKind::ChildRestarted => {
                info!(
                    supervisor = process,
                    child = e.child.as_deref(),
                    restarts = e.attempt,
                    reason,
                    "child restarted"
                );
            }
            LifecycleKind::RestartIntensityExceeded => {
                error!(
                    supervisor = process,
                    child = e.child.as_deref(),
                    reason,
                    "restart intensity exceeded; escalating"
                );
            }
            LifecycleKind::EventRegistered => {
                debug!(event = e.event.as_deref(), producer = ?e.pid, "event registered");
            }
            LifecycleKind::EventUnregistered => {
                debug!(event = e.event.as_deref(), producer = ?e.pid, reason, "event unregistered");
            }
            LifecycleKind::ShutdownRequested => info!("shutdown requested"),
            LifecycleKind::AllStoppedWithin => info!("all processes stopped within grace"),
            LifecycleKind::GraceExceeded => error!(stuck = reason, "shutdown grace exceeded"),
            LifecycleKind::SubscriberPanicked => {
                error!(subscriber = process, reason, "subscriber panicked");
            }
            LifecycleKind::SubscriberOverflow => {
                warn!(subscriber = process, reason, "subscriber dropped a record");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
