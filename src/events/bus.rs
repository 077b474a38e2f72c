//! # Event bus: named pub/sub with producer monitoring.
//!
//! One producer owns an event name; any number of processes subscribe to it.
//! Subscribing also monitors the producer: when it terminates (or unregisters
//! the name), every remaining subscriber receives exactly one
//! [`Message::EventDown`].
//!
//! ## Tables
//! ```text
//! events:     name ─► { owner, tag, subscribers: [pid, ..] }
//! produced:   pid  ─► {name, ..}        (names owned by pid)
//! subscribed: pid  ─► {name, ..}        (names pid listens to)
//! ```
//! All three live behind one mutex. Deliveries happen after it is released,
//! so a slow or dead subscriber never blocks a publisher.
//!
//! ## Rules
//! - Only live processes (`Starting` or `Running`) may register or subscribe.
//! - Subscriptions are weak: the bus never keeps a subscriber alive.
//! - Re-registering a name by its current owner is a no-op; by another live owner an error.
//! - Payload tags are advisory: a mismatch is logged, the payload is still delivered.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::core::registry::Registry;
use crate::core::{
    EventDown, ExitReason, Message, Payload, PayloadTag, ProcessId, ProcessStatus,
};
use crate::error::EventError;
use crate::lifecycle::{LifecycleBus, LifecycleEvent, LifecycleKind};

struct EventEntry {
    owner: ProcessId,
    tag: PayloadTag,
    subscribers: Vec<ProcessId>,
}

#[derive(Default)]
struct Tables {
    events: HashMap<Arc<str>, EventEntry>,
    produced: HashMap<ProcessId, HashSet<Arc<str>>>,
    subscribed: HashMap<ProcessId, HashSet<Arc<str>>>,
}

impl Tables {
    /// Removes `name` and detaches it from its subscribers; returns the entry.
    fn drop_event(&mut self, name: &str) -> Option<(Arc<str>, EventEntry)> {
        let (name, entry) = self.events.remove_entry(name)?;
        if let Some(names) = self.produced.get_mut(&entry.owner) {
            names.remove(&name);
            if names.is_empty() {
                self.produced.remove(&entry.owner);
            }
        }
        for sub in &entry.subscribers {
            if let Some(names) = self.subscribed.get_mut(sub) {
                names.remove(&name);
                if names.is_empty() {
                    self.subscribed.remove(sub);
                }
            }
        }
        Some((name, entry))
    }
}

struct Inner {
    tables: Mutex<Tables>,
    registry: Arc<Registry>,
    lifecycle: LifecycleBus,
}

/// Registry of named events, their producers and subscribers.
///
/// Processes normally go through [`Context`](crate::Context), which fills in
/// their own pid; the bus itself is reachable through
/// [`Runtime::events`](crate::Runtime::events).
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub(crate) fn new(registry: Arc<Registry>, lifecycle: LifecycleBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                registry,
                lifecycle,
            }),
        }
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Must run under the tables lock: `release` drops a pid from the registry
    /// before pruning its entries, so nothing slips in between.
    fn ensure_live(&self, pid: ProcessId) -> Result<(), EventError> {
        match self.inner.registry.get(pid) {
            Some(process) if process.status().is_live() => Ok(()),
            _ => Err(EventError::NoProcess { pid }),
        }
    }

    /// Registers `owner` as the producer of `event`.
    pub fn register(
        &self,
        owner: ProcessId,
        event: impl Into<Arc<str>>,
        tag: PayloadTag,
    ) -> Result<(), EventError> {
        let event = event.into();
        {
            let mut tables = self.tables();
            self.ensure_live(owner)?;
            if let Some(entry) = tables.events.get(&event) {
                if entry.owner == owner {
                    return Ok(());
                }
                return Err(EventError::RegistrationConflict {
                    event: event.to_string(),
                    owner: entry.owner,
                });
            }
            tables.events.insert(
                Arc::clone(&event),
                EventEntry {
                    owner,
                    tag,
                    subscribers: Vec::new(),
                },
            );
            tables
                .produced
                .entry(owner)
                .or_default()
                .insert(Arc::clone(&event));
        }

        debug!(event = %event, producer = %owner, payload = tag.name(), "event registered");
        self.inner.lifecycle.publish(
            LifecycleEvent::new(LifecycleKind::EventRegistered)
                .with_pid(owner)
                .with_event(event),
        );
        Ok(())
    }

    /// Drops `event`; remaining subscribers get an `EventDown` with reason `unregistered`.
    pub fn unregister(&self, owner: ProcessId, event: &str) -> Result<(), EventError> {
        let (name, entry) = {
            let mut tables = self.tables();
            match tables.events.get(event) {
                None => {
                    return Err(EventError::UnknownEvent {
                        event: event.to_string(),
                    });
                }
                Some(entry) if entry.owner != owner => {
                    return Err(EventError::NotOwner {
                        event: event.to_string(),
                        caller: owner,
                    });
                }
                Some(_) => {}
            }
            match tables.drop_event(event) {
                Some(dropped) => dropped,
                None => return Ok(()),
            }
        };

        self.notify_down(owner, vec![(name, entry)], ExitReason::custom("unregistered"));
        Ok(())
    }

    /// Subscribes `subscriber` to `event`, monitoring its producer.
    pub fn subscribe(&self, subscriber: ProcessId, event: &str) -> Result<(), EventError> {
        let mut tables = self.tables();
        self.ensure_live(subscriber)?;
        let Some((name, entry)) = tables.events.get_key_value(event) else {
            return Err(EventError::UnknownEvent {
                event: event.to_string(),
            });
        };
        let name = Arc::clone(name);
        let producer = entry.owner;

        if let Some(entry) = tables.events.get_mut(event) {
            if !entry.subscribers.contains(&subscriber) {
                entry.subscribers.push(subscriber);
            }
        }
        tables.subscribed.entry(subscriber).or_default().insert(name);
        drop(tables);

        debug!(event, subscriber = %subscriber, producer = %producer, "event monitored");
        Ok(())
    }

    /// Removes a subscription. Returns `false` if there was none.
    pub fn unsubscribe(&self, subscriber: ProcessId, event: &str) -> bool {
        let mut tables = self.tables();
        let removed = match tables.events.get_mut(event) {
            Some(entry) => {
                let before = entry.subscribers.len();
                entry.subscribers.retain(|pid| *pid != subscriber);
                entry.subscribers.len() != before
            }
            None => false,
        };
        if let Some(names) = tables.subscribed.get_mut(&subscriber) {
            names.remove(event);
            if names.is_empty() {
                tables.subscribed.remove(&subscriber);
            }
        }
        removed
    }

    /// Delivers `payload` to every subscriber of `event`.
    ///
    /// Returns the number of mailboxes reached; dead subscribers are skipped.
    pub fn publish(
        &self,
        owner: ProcessId,
        event: &str,
        payload: Payload,
    ) -> Result<usize, EventError> {
        let (name, targets) = {
            let tables = self.tables();
            let Some((name, entry)) = tables.events.get_key_value(event) else {
                return Err(EventError::UnknownEvent {
                    event: event.to_string(),
                });
            };
            if entry.owner != owner {
                return Err(EventError::NotOwner {
                    event: event.to_string(),
                    caller: owner,
                });
            }
            if !entry.tag.matches(&payload) {
                warn!(
                    event,
                    expected = entry.tag.name(),
                    got = payload.type_name(),
                    "event payload does not match registered type"
                );
            }
            (Arc::clone(name), entry.subscribers.clone())
        };

        let mut delivered = 0;
        for pid in targets {
            let msg = Message::Event {
                event: Arc::clone(&name),
                producer: owner,
                payload: payload.clone(),
            };
            if self.inner.registry.send(pid, msg).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Cleanup for a terminated process: drops the events it produced (notifying
    /// their subscribers once) and every subscription it held.
    pub(crate) fn process_terminated(&self, pid: ProcessId, reason: &ExitReason) {
        let dropped = {
            let mut tables = self.tables();

            let mut dropped = Vec::new();
            if let Some(names) = tables.produced.remove(&pid) {
                for name in names {
                    if let Some(d) = tables.drop_event(&name) {
                        dropped.push(d);
                    }
                }
            }

            if let Some(names) = tables.subscribed.remove(&pid) {
                for name in names {
                    if let Some(entry) = tables.events.get_mut(&name) {
                        entry.subscribers.retain(|sub| *sub != pid);
                    }
                }
            }
            dropped
        };

        if !dropped.is_empty() {
            self.notify_down(pid, dropped, reason.clone());
        }
    }

    fn notify_down(
        &self,
        producer: ProcessId,
        dropped: Vec<(Arc<str>, EventEntry)>,
        reason: ExitReason,
    ) {
        for (name, entry) in dropped {
            debug!(
                event = %name,
                producer = %producer,
                subscribers = entry.subscribers.len(),
                reason = %reason,
                "event down"
            );
            for sub in &entry.subscribers {
                let down = EventDown {
                    event: Arc::clone(&name),
                    producer,
                    reason: reason.clone(),
                };
                let _ = self.inner.registry.send(*sub, Message::EventDown(down));
            }
            self.inner.lifecycle.publish(
                LifecycleEvent::new(LifecycleKind::EventUnregistered)
                    .with_pid(producer)
                    .with_event(name)
                    .with_reason(reason.to_string()),
            );
        }
    }

    /// Current producer of `event`.
    pub fn owner(&self, event: &str) -> Option<ProcessId> {
        self.tables().events.get(event).map(|e| e.owner)
    }

    /// Current subscribers of `event`, in subscription order.
    pub fn subscribers(&self, event: &str) -> Vec<ProcessId> {
        self.tables()
            .events
            .get(event)
            .map(|e| e.subscribers.clone())
            .unwrap_or_default()
    }

    pub fn is_registered(&self, event: &str) -> bool {
        self.tables().events.contains_key(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProcessRef;
    use crate::core::mailbox::Mailbox;

    struct Fixture {
        bus: EventBus,
        registry: Arc<Registry>,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Registry::new();
            let bus = EventBus::new(Arc::clone(&registry), LifecycleBus::new(16));
            Self { bus, registry }
        }

        fn process(&self) -> (ProcessRef, Mailbox) {
            let (p, mb) = ProcessRef::new(None, None);
            self.registry.insert(p.clone()).expect("insert");
            (p, mb)
        }
    }

    fn tag() -> PayloadTag {
        PayloadTag::of::<String>()
    }

    #[test]
    fn conflicting_owner_is_rejected_but_same_owner_is_idempotent() {
        let fx = Fixture::new();
        let (a, _ma) = fx.process();
        let (b, _mb) = fx.process();

        fx.bus.register(a.pid(), "notify", tag()).expect("register");
        fx.bus.register(a.pid(), "notify", tag()).expect("same owner");
        assert_eq!(
            fx.bus.register(b.pid(), "notify", tag()),
            Err(EventError::RegistrationConflict {
                event: "notify".into(),
                owner: a.pid(),
            })
        );
    }

    #[test]
    fn processes_that_are_not_live_cannot_take_names_or_subscribe() {
        let fx = Fixture::new();
        let (producer, _mp) = fx.process();
        fx.bus.register(producer.pid(), "notify", tag()).expect("register");

        let (never_spawned, _mn) = ProcessRef::new(None, None);
        let (gone, _mg) = fx.process();
        fx.registry.remove(gone.pid());
        let (stopping, _ms) = fx.process();
        stopping.set_status(ProcessStatus::Stopping);

        for p in [&never_spawned, &gone, &stopping] {
            let pid = p.pid();
            assert_eq!(
                fx.bus.register(pid, "other", tag()),
                Err(EventError::NoProcess { pid })
            );
            assert_eq!(
                fx.bus.subscribe(pid, "notify"),
                Err(EventError::NoProcess { pid })
            );
        }
        assert!(!fx.bus.is_registered("other"));
        assert!(fx.bus.subscribers("notify").is_empty());

        let (live, _ml) = fx.process();
        fx.bus.register(live.pid(), "other", tag()).expect("live producer");
        assert_eq!(fx.bus.owner("other"), Some(live.pid()));
    }

    #[test]
    fn subscribe_to_unknown_event_fails() {
        let fx = Fixture::new();
        let (a, _ma) = fx.process();
        assert_eq!(
            fx.bus.subscribe(a.pid(), "missing"),
            Err(EventError::UnknownEvent {
                event: "missing".into()
            })
        );
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let fx = Fixture::new();
        let (producer, _mp) = fx.process();
        let (s1, mut m1) = fx.process();
        let (s2, mut m2) = fx.process();

        fx.bus.register(producer.pid(), "notify", tag()).expect("register");
        fx.bus.subscribe(s1.pid(), "notify").expect("s1");
        fx.bus.subscribe(s2.pid(), "notify").expect("s2");
        fx.bus.subscribe(s2.pid(), "notify").expect("s2 twice");

        let n = fx
            .bus
            .publish(producer.pid(), "notify", Payload::new("EVNT 1".to_string()))
            .expect("publish");
        assert_eq!(n, 2);

        for mb in [&mut m1, &mut m2] {
            match mb.recv().await.expect("event") {
                Message::Event { event, producer: from, payload } => {
                    assert_eq!(&*event, "notify");
                    assert_eq!(from, producer.pid());
                    assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("EVNT 1"));
                }
                other => panic!("unexpected {}", other.kind()),
            }
        }
    }

    #[test]
    fn only_the_owner_may_publish() {
        let fx = Fixture::new();
        let (producer, _mp) = fx.process();
        let (other, _mo) = fx.process();
        fx.bus.register(producer.pid(), "notify", tag()).expect("register");

        assert_eq!(
            fx.bus.publish(other.pid(), "notify", Payload::new(String::new())),
            Err(EventError::NotOwner {
                event: "notify".into(),
                caller: other.pid(),
            })
        );
    }

    #[tokio::test]
    async fn producer_death_notifies_once_and_prunes_the_name() {
        let fx = Fixture::new();
        let (producer, _mp) = fx.process();
        let (sub, mut ms) = fx.process();

        fx.bus.register(producer.pid(), "notify", tag()).expect("register");
        fx.bus.subscribe(sub.pid(), "notify").expect("subscribe");

        fx.bus.process_terminated(producer.pid(), &ExitReason::Normal);
        fx.bus.process_terminated(producer.pid(), &ExitReason::Normal);

        match ms.recv().await.expect("down") {
            Message::EventDown(down) => {
                assert_eq!(&*down.event, "notify");
                assert_eq!(down.producer, producer.pid());
                assert_eq!(down.reason, ExitReason::Normal);
            }
            other => panic!("unexpected {}", other.kind()),
        }
        assert_eq!(ms.len(), 0);
        assert!(!fx.bus.is_registered("notify"));
        assert!(matches!(
            fx.bus.subscribe(sub.pid(), "notify"),
            Err(EventError::UnknownEvent { .. })
        ));

        let (next, _mn) = fx.process();
        fx.bus.register(next.pid(), "notify", tag()).expect("name is free again");
    }

    #[test]
    fn subscriber_death_removes_its_subscriptions() {
        let fx = Fixture::new();
        let (producer, _mp) = fx.process();
        let (sub, _ms) = fx.process();

        fx.bus.register(producer.pid(), "a", tag()).expect("a");
        fx.bus.register(producer.pid(), "b", tag()).expect("b");
        fx.bus.subscribe(sub.pid(), "a").expect("sub a");
        fx.bus.subscribe(sub.pid(), "b").expect("sub b");

        fx.bus.process_terminated(sub.pid(), &ExitReason::Shutdown);
        assert!(fx.bus.subscribers("a").is_empty());
        assert!(fx.bus.subscribers("b").is_empty());
        assert_eq!(fx.bus.owner("a"), Some(producer.pid()));
    }

    #[tokio::test]
    async fn unregister_sends_down_with_unregistered_reason() {
        let fx = Fixture::new();
        let (producer, _mp) = fx.process();
        let (sub, mut ms) = fx.process();

        fx.bus.register(producer.pid(), "notify", tag()).expect("register");
        fx.bus.subscribe(sub.pid(), "notify").expect("subscribe");
        assert!(matches!(
            fx.bus.unregister(sub.pid(), "notify"),
            Err(EventError::NotOwner { .. })
        ));
        fx.bus.unregister(producer.pid(), "notify").expect("unregister");

        match ms.recv().await.expect("down") {
            Message::EventDown(down) => assert_eq!(down.reason, ExitReason::custom("unregistered")),
            other => panic!("unexpected {}", other.kind()),
        }
        assert!(!fx.bus.unsubscribe(sub.pid(), "notify"));
    }
}
