//! # Process handles.
//!
//! [`ProcessRef`] is a cheap, cloneable handle to one process: its identity,
//! its mailbox sender, its stop signal and its observable status. The process
//! task itself owns the behavior and the receiving half of the mailbox (see
//! `core::actor`).
//!
//! ## Stop semantics
//! - `stop(reason)` is cooperative: the handler in progress (if any) finishes,
//!   then the loop exits and `terminate` runs with `reason`.
//! - The first reason wins; later calls and calls on terminated processes are no-ops.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::mailbox::{Mailbox, MailboxSender, mailbox};
use crate::core::{ExitReason, Message, ProcessId, ProcessStatus};

struct ProcessCell {
    pid: ProcessId,
    name: Option<Arc<str>>,
    parent: Option<ProcessId>,
    tx: MailboxSender,
    stop: CancellationToken,
    stop_reason: Mutex<Option<ExitReason>>,
    status: watch::Sender<ProcessStatus>,
    exit: OnceLock<ExitReason>,
}

/// Handle to a (possibly terminated) process.
#[derive(Clone)]
pub struct ProcessRef {
    cell: Arc<ProcessCell>,
}

impl ProcessRef {
    /// Allocates a fresh identity in `Starting` state together with its mailbox.
    pub(crate) fn new(name: Option<Arc<str>>, parent: Option<ProcessId>) -> (Self, Mailbox) {
        let (tx, mailbox) = mailbox();
        let (status, _) = watch::channel(ProcessStatus::Starting);
        let cell = ProcessCell {
            pid: ProcessId::next(),
            name,
            parent,
            tx,
            stop: CancellationToken::new(),
            stop_reason: Mutex::new(None),
            status,
            exit: OnceLock::new(),
        };
        (
            Self {
                cell: Arc::new(cell),
            },
            mailbox,
        )
    }

    pub fn pid(&self) -> ProcessId {
        self.cell.pid
    }

    pub fn name(&self) -> Option<&str> {
        self.cell.name.as_deref()
    }

    pub fn parent(&self) -> Option<ProcessId> {
        self.cell.parent
    }

    pub fn status(&self) -> ProcessStatus {
        *self.cell.status.borrow()
    }

    pub fn is_alive(&self) -> bool {
        !self.status().is_terminated()
    }

    /// Registered name, or the printable pid for unnamed processes.
    pub fn display_name(&self) -> Arc<str> {
        match &self.cell.name {
            Some(name) => Arc::clone(name),
            None => Arc::from(self.cell.pid.to_string()),
        }
    }

    /// Reason the process terminated with, once it is `Terminated`.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.cell.exit.get().cloned()
    }

    /// Asks the process to stop with `reason`.
    ///
    /// Returns `false` if the process already terminated or a stop was already requested.
    pub fn stop(&self, reason: ExitReason) -> bool {
        if !self.is_alive() {
            return false;
        }
        let mut slot = self
            .cell
            .stop_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        drop(slot);

        self.cell.stop.cancel();
        true
    }

    /// Waits until the process is `Terminated` and returns its exit reason.
    pub async fn wait(&self) -> ExitReason {
        let mut rx = self.cell.status.subscribe();
        // The sender lives in `cell`, which we hold, so this cannot fail.
        let _ = rx.wait_for(ProcessStatus::is_terminated).await;
        self.exit_reason().unwrap_or(ExitReason::Kill)
    }

    pub(crate) fn name_arc(&self) -> Option<Arc<str>> {
        self.cell.name.clone()
    }

    pub(crate) fn deliver(&self, msg: Message) -> Result<(), Message> {
        self.cell.tx.send(msg)
    }

    pub(crate) fn stop_token(&self) -> &CancellationToken {
        &self.cell.stop
    }

    /// Reason passed to the first `stop` call (`Shutdown` if none was given).
    pub(crate) fn requested_stop(&self) -> ExitReason {
        self.cell
            .stop_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or(ExitReason::Shutdown)
    }

    pub(crate) fn set_status(&self, status: ProcessStatus) {
        self.cell.status.send_replace(status);
    }

    /// Records the exit reason and flips the status to `Terminated`.
    pub(crate) fn mark_terminated(&self, reason: ExitReason) {
        let _ = self.cell.exit.set(reason);
        self.set_status(ProcessStatus::Terminated);
    }
}

impl PartialEq for ProcessRef {
    fn eq(&self, other: &Self) -> bool {
        self.cell.pid == other.cell.pid
    }
}

impl Eq for ProcessRef {}

impl fmt::Debug for ProcessRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRef")
            .field("pid", &self.cell.pid)
            .field("name", &self.cell.name)
            .field("parent", &self.cell.parent)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stop_reason_wins() {
        let (p, _mb) = ProcessRef::new(Some("worker".into()), None);

        assert!(p.stop(ExitReason::custom("first")));
        assert!(!p.stop(ExitReason::Kill));
        assert!(p.stop_token().is_cancelled());
        assert_eq!(p.requested_stop(), ExitReason::custom("first"));
    }

    #[test]
    fn stop_after_termination_is_a_noop() {
        let (p, _mb) = ProcessRef::new(None, None);
        p.mark_terminated(ExitReason::Normal);

        assert!(!p.stop(ExitReason::Kill));
        assert!(!p.stop_token().is_cancelled());
        assert_eq!(p.exit_reason(), Some(ExitReason::Normal));
    }

    #[tokio::test]
    async fn wait_returns_exit_reason() {
        let (p, _mb) = ProcessRef::new(None, None);
        let waiter = {
            let p = p.clone();
            tokio::spawn(async move { p.wait().await })
        };
        p.set_status(ProcessStatus::Running);
        p.mark_terminated(ExitReason::failure("boom"));

        assert_eq!(waiter.await.expect("join"), ExitReason::failure("boom"));
        assert!(!p.is_alive());
    }

    #[test]
    fn display_name_falls_back_to_pid() {
        let (p, _mb) = ProcessRef::new(None, None);
        assert_eq!(&*p.display_name(), p.pid().to_string().as_str());
    }
}
