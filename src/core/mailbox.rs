//! # Per-process mailbox.
//!
//! Thin wrapper over an unbounded [`tokio::sync::mpsc`] channel:
//! - **Non-blocking send**: `send` never waits and never drops while the mailbox is open.
//! - **FIFO**: messages from one sender arrive in the order they were sent.
//! - **Closed**: once the owner is gone (or `close` was called and the queue drained),
//!   `recv` returns `None` instead of waiting forever; senders get their message back.

use tokio::sync::mpsc;

use crate::core::Message;

/// Creates a connected sender/receiver pair.
pub(crate) fn mailbox() -> (MailboxSender, Mailbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MailboxSender { tx }, Mailbox { rx })
}

/// Cloneable sending half, held by the registry and by anyone addressing the process.
#[derive(Clone, Debug)]
pub(crate) struct MailboxSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl MailboxSender {
    /// Enqueues at the tail. Gives the message back if the mailbox is closed.
    pub fn send(&self, msg: Message) -> Result<(), Message> {
        self.tx.send(msg).map_err(|e| e.0)
    }
}

/// Receiving half, owned by the process loop.
#[derive(Debug)]
pub(crate) struct Mailbox {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Mailbox {
    /// Waits for the next message; `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Stops accepting new messages; already queued ones can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.rx.len()
    }
}
