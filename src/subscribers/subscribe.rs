//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom lifecycle handlers
//! (logging, metrics, audit) into the runtime. Each subscriber is driven by a
//! dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block processes nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow, records for that subscriber are
//!   **dropped** and a `SubscriberOverflow` record is published.

use async_trait::async_trait;

use crate::lifecycle::LifecycleEvent;

/// Contract for lifecycle subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single lifecycle record.
    async fn on_event(&self, event: &LifecycleEvent);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
