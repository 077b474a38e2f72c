//! # Non-blocking lifecycle fan-out to multiple subscribers.
//!
//! ```text
//! emit(record)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees records in order
//! - **No cross-subscriber ordering**
//! - **Overflow**: record dropped for that subscriber only, `SubscriberOverflow` published
//! - **Isolation**: a panicking subscriber is reported and keeps receiving records

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::lifecycle::{LifecycleBus, LifecycleEvent, LifecycleKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<LifecycleEvent>>,
}

/// Fan-out coordinator for lifecycle subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    bus: LifecycleBus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: LifecycleBus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<LifecycleEvent>>(sub.queue_capacity().max(1));
            let bus_for_worker = bus.clone();

            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        bus_for_worker.publish(LifecycleEvent::subscriber_panicked(
                            sub.name(),
                            panic_message(panic.as_ref()),
                        ));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self { channels, bus }
    }

    /// Emits a record to all subscribers (non-blocking).
    ///
    /// Overflow records are not re-published when they themselves overflow.
    pub fn emit(&self, event: LifecycleEvent) {
        let is_overflow = matches!(event.kind, LifecycleKind::SubscriberOverflow);
        let event = Arc::new(event);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus
                    .publish(LifecycleEvent::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<LifecycleKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &LifecycleEvent) {
            self.seen.lock().expect("recorder lock").push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &LifecycleEvent) {
            panic!("exploder");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_is_isolated_and_reported() {
        let bus = LifecycleBus::new(16);
        let mut rx = bus.subscribe();
        let recorder = Arc::new(Recorder::default());
        let set = SubscriberSet::new(
            vec![Arc::new(Exploder), recorder.clone() as Arc<dyn Subscribe>],
            bus,
        );
        assert_eq!(set.len(), 2);

        set.emit(LifecycleEvent::new(LifecycleKind::ShutdownRequested));

        let report = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic report in time")
            .expect("bus open");
        assert_eq!(report.kind, LifecycleKind::SubscriberPanicked);
        assert_eq!(report.reason.as_deref(), Some("exploder"));

        tokio::time::timeout(Duration::from_secs(1), async {
            while recorder.seen.lock().expect("recorder lock").is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("recorder saw the record");
        assert_eq!(
            recorder.seen.lock().expect("recorder lock").as_slice(),
            &[LifecycleKind::ShutdownRequested]
        );
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
