//! # Broadcast channel for lifecycle events.
//!
//! [`LifecycleBus`] is a thin wrapper around [`tokio::sync::broadcast`] that
//! provides non-blocking publishing from every corner of the runtime (process
//! loops, supervisors, the event bus, shutdown).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                        Consumers:
//!   process loop  ──┐
//!   Supervisor    ──┼──► LifecycleBus ──┬──► subscriber listener ──► SubscriberSet
//!   EventBus      ──┤   (broadcast)     └──► Runtime::lifecycle() receivers
//!   Runtime       ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: records are lost if nobody listens at send time.

use tokio::sync::broadcast;

use super::event::LifecycleEvent;

/// Broadcast channel for lifecycle records. Cheap to clone.
#[derive(Clone, Debug)]
pub struct LifecycleBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleBus {
    /// Creates a new bus with the given capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a record to all current receivers; dropped if there are none.
    pub fn publish(&self, ev: LifecycleEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes records sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleKind;

    #[tokio::test]
    async fn receivers_see_records_published_after_subscribing() {
        let bus = LifecycleBus::new(0);
        bus.publish(LifecycleEvent::new(LifecycleKind::ShutdownRequested));

        let mut rx = bus.subscribe();
        bus.publish(LifecycleEvent::new(LifecycleKind::AllStoppedWithin));

        let ev = rx.recv().await.expect("record");
        assert_eq!(ev.kind, LifecycleKind::AllStoppedWithin);
    }
}
