//! # Process registry.
//!
//! Central table of live processes, keyed by [`ProcessId`], with a secondary
//! index for registered names.
//!
//! ## Rules
//! - A process is inserted before its `init` runs and removed during cleanup.
//! - A name maps to at most one live process; it is freed when that process terminates.
//! - All access is serialized through one lock; no await happens while it is held.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::{Message, ProcessId, ProcessRef};
use crate::error::{SendError, SpawnError};

#[derive(Default)]
struct Tables {
    procs: HashMap<ProcessId, ProcessRef>,
    names: HashMap<Arc<str>, ProcessId>,
}

/// Name/id table shared by the runtime, the timer service and the event bus.
#[derive(Default)]
pub(crate) struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a process; fails if its name is held by another live process.
    pub fn insert(&self, process: ProcessRef) -> Result<(), SpawnError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(name) = process.name_arc() {
            if let Some(holder) = tables.names.get(&name) {
                return Err(SpawnError::NameTaken {
                    name: name.to_string(),
                    holder: *holder,
                });
            }
            tables.names.insert(name, process.pid());
        }
        tables.procs.insert(process.pid(), process);
        Ok(())
    }

    pub fn remove(&self, pid: ProcessId) -> Option<ProcessRef> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let process = tables.procs.remove(&pid)?;

        if let Some(name) = process.name() {
            if tables.names.get(name) == Some(&pid) {
                tables.names.remove(name);
            }
        }
        Some(process)
    }

    pub fn get(&self, pid: ProcessId) -> Option<ProcessRef> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.procs.get(&pid).cloned()
    }

    pub fn whereis(&self, name: &str) -> Option<ProcessId> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.names.get(name).copied()
    }

    /// Returns sorted list of live process ids.
    pub fn list(&self) -> Vec<ProcessId> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut pids: Vec<ProcessId> = tables.procs.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// Returns every live process, ordered by id.
    pub fn snapshot(&self) -> Vec<ProcessRef> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut procs: Vec<ProcessRef> = tables.procs.values().cloned().collect();
        procs.sort_unstable_by_key(|p| p.pid());
        procs
    }

    /// Enqueues `msg` into the mailbox of `pid`.
    pub fn send(&self, pid: ProcessId, msg: Message) -> Result<(), SendError> {
        let process = self.get(pid).ok_or(SendError::NoProcess { pid })?;
        process
            .deliver(msg)
            .map_err(|_| SendError::NoProcess { pid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Payload;

    #[test]
    fn names_are_unique_among_live_processes() {
        let registry = Registry::new();
        let (first, _mb1) = ProcessRef::new(Some("logger".into()), None);
        let (second, _mb2) = ProcessRef::new(Some("logger".into()), None);

        registry.insert(first.clone()).expect("first insert");
        let err = registry.insert(second.clone()).expect_err("name is taken");
        assert_eq!(
            err,
            SpawnError::NameTaken {
                name: "logger".into(),
                holder: first.pid(),
            }
        );

        registry.remove(first.pid());
        assert_eq!(registry.whereis("logger"), None);
        registry.insert(second.clone()).expect("name freed");
        assert_eq!(registry.whereis("logger"), Some(second.pid()));
    }

    #[test]
    fn send_to_unknown_pid_fails() {
        let registry = Registry::new();
        let (process, _mb) = ProcessRef::new(None, None);
        let pid = process.pid();

        let msg = Message::Info {
            from: None,
            payload: Payload::new(1_u8),
        };
        assert_eq!(registry.send(pid, msg), Err(SendError::NoProcess { pid }));
    }

    #[test]
    fn list_is_sorted() {
        let registry = Registry::new();
        let mut keep = Vec::new();
        for _ in 0..4 {
            let (p, mb) = ProcessRef::new(None, None);
            registry.insert(p.clone()).expect("insert");
            keep.push((p, mb));
        }
        let listed = registry.list();
        let mut sorted = listed.clone();
        sorted.sort();
        assert_eq!(listed, sorted);
        assert_eq!(listed.len(), 4);
    }
}
