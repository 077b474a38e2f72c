use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::registry::Registry;
use crate::core::runtime::RuntimeParts;
use crate::core::timer::TimerService;
use crate::core::{Runtime, RuntimeConfig};
use crate::events::EventBus;
use crate::lifecycle::LifecycleBus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Runtime`] with optional lifecycle subscribers.
pub struct RuntimeBuilder {
    cfg: RuntimeConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RuntimeConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets lifecycle subscribers for observability.
    ///
    /// Subscribers receive runtime records (spawns, terminations, restarts,
    /// escalations) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the runtime and starts its service tasks.
    ///
    /// - lifecycle bus and subscriber workers
    /// - registry, event bus
    /// - timer driver
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Runtime {
        let lifecycle = LifecycleBus::new(self.cfg.lifecycle_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, lifecycle.clone()));
        let token = CancellationToken::new();

        let registry = Registry::new();
        let events = EventBus::new(Arc::clone(&registry), lifecycle.clone());
        let timers = TimerService::new(Arc::clone(&registry));
        timers.spawn_driver(token.clone());

        if !subs.is_empty() {
            spawn_listener(&lifecycle, Arc::clone(&subs), token.clone());
        }

        Runtime::from_parts(RuntimeParts {
            cfg: self.cfg,
            registry,
            events,
            timers,
            lifecycle,
            subs,
            token,
        })
    }
}

/// Forwards lifecycle records to the subscriber set (fire-and-forget).
///
/// On cancellation, records already queued are still forwarded.
fn spawn_listener(lifecycle: &LifecycleBus, subs: Arc<SubscriberSet>, token: CancellationToken) {
    let mut rx = lifecycle.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "lifecycle listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        subs.emit(ev);
                    }
                    break;
                }
            }
        }
    });
}
