//! # Timer service: deferred messages.
//!
//! `send_after(target, payload, delay)` queues a [`Message::Timer`] for delivery
//! no earlier than `delay` from now. A single driver task sleeps until the
//! earliest deadline and delivers every due entry.
//!
//! ## Ordering
//! Entries are keyed by `(fire_at, TimerId)`. Ids grow monotonically, so two
//! timers with the same deadline fire in scheduling order. Due entries are
//! delivered while the table lock is held, so the mailbox sees them in key order.
//!
//! ## Dead targets
//! Entries of a terminated process are dropped during its cleanup
//! ([`TimerService::cancel_target`]). If the target dies between that and
//! firing, delivery is silently skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::core::registry::Registry;
use crate::core::{Message, Payload, ProcessId};

/// Identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct Entry {
    target: ProcessId,
    payload: Payload,
}

#[derive(Default)]
struct TimerTable {
    queue: BTreeMap<(Instant, TimerId), Entry>,
    index: HashMap<TimerId, Instant>,
    by_target: HashMap<ProcessId, HashSet<TimerId>>,
}

impl TimerTable {
    fn remove(&mut self, id: TimerId) -> Option<Entry> {
        let fire_at = self.index.remove(&id)?;
        let entry = self.queue.remove(&(fire_at, id))?;
        if let Some(ids) = self.by_target.get_mut(&entry.target) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_target.remove(&entry.target);
            }
        }
        Some(entry)
    }

    /// Pops the earliest entry if it is due at `now`.
    fn pop_due(&mut self, now: Instant) -> Option<(TimerId, Entry)> {
        let (&(fire_at, id), _) = self.queue.first_key_value()?;
        if fire_at > now {
            return None;
        }
        self.remove(id).map(|entry| (id, entry))
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.queue.first_key_value().map(|(&(at, _), _)| at)
    }
}

struct Shared {
    table: Mutex<TimerTable>,
    wake: Notify,
    registry: Arc<Registry>,
    next_id: AtomicU64,
}

impl Shared {
    /// Delivers all due entries; returns the next deadline, if any.
    fn fire_due(&self, now: Instant) -> Option<Instant> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some((id, entry)) = table.pop_due(now) {
            let msg = Message::Timer {
                id,
                payload: entry.payload,
            };
            if self.registry.send(entry.target, msg).is_err() {
                trace!(timer = %id, target = %entry.target, "timer target is gone, dropped");
            }
        }
        table.next_deadline()
    }
}

/// Schedules deferred self-messages.
#[derive(Clone)]
pub(crate) struct TimerService {
    shared: Arc<Shared>,
}

impl TimerService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(TimerTable::default()),
                wake: Notify::new(),
                registry,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Spawns the driver task; it runs until `token` is cancelled.
    pub fn spawn_driver(&self, token: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                let next = shared.fire_due(Instant::now());
                match next {
                    Some(deadline) => tokio::select! {
                        _ = token.cancelled() => break,
                        _ = time::sleep_until(deadline) => {}
                        _ = shared.wake.notified() => {}
                    },
                    None => tokio::select! {
                        _ = token.cancelled() => break,
                        _ = shared.wake.notified() => {}
                    },
                }
            }
        });
    }

    pub fn send_after(&self, target: ProcessId, payload: Payload, delay: Duration) -> TimerId {
        let id = TimerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let fire_at = Instant::now() + delay;
        {
            let mut table = self
                .shared
                .table
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            table.queue.insert((fire_at, id), Entry { target, payload });
            table.index.insert(id, fire_at);
            table.by_target.entry(target).or_default().insert(id);
        }
        self.shared.wake.notify_one();
        id
    }

    /// Cancels a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut table = self
            .shared
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        table.remove(id).is_some()
    }

    /// Drops every pending timer aimed at `target`.
    pub fn cancel_target(&self, target: ProcessId) -> usize {
        let mut table = self
            .shared
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(ids) = table.by_target.remove(&target) else {
            return 0;
        };
        for id in &ids {
            if let Some(fire_at) = table.index.remove(id) {
                table.queue.remove(&(fire_at, *id));
            }
        }
        ids.len()
    }

    pub fn pending(&self) -> usize {
        self.shared
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .len()
    }
}
