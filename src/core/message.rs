//! # Mailbox envelopes.
//!
//! Every value that lands in a process mailbox is a [`Message`]. The variant
//! tells the behavior where it came from:
//!
//! ```text
//! Runtime::call / Context::call      ──► Call      (reply expected)
//! Runtime::cast / Context::cast      ──► Cast
//! Runtime::send / Context::send      ──► Info
//! TimerService (send_after)          ──► Timer
//! EventBus::publish                  ──► Event
//! producer terminated / unregistered ──► EventDown
//! child terminated                   ──► Exit      (to the parent)
//! ```

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::core::{ExitReason, Payload, ProcessId, TimerId};

/// Envelope delivered to a process mailbox.
#[derive(Debug)]
pub enum Message {
    /// Synchronous request; the handler's reply is sent back through `reply`.
    Call {
        from: Option<ProcessId>,
        request: Payload,
        reply: ReplyTo,
    },
    /// Asynchronous request.
    Cast {
        from: Option<ProcessId>,
        payload: Payload,
    },
    /// Plain message.
    Info {
        from: Option<ProcessId>,
        payload: Payload,
    },
    /// Payload scheduled with `send_after`.
    Timer { id: TimerId, payload: Payload },
    /// Payload published on a subscribed event.
    Event {
        event: Arc<str>,
        producer: ProcessId,
        payload: Payload,
    },
    /// The producer of a subscribed event is gone.
    EventDown(EventDown),
    /// A child of this process terminated.
    Exit(ChildExit),
}

impl Message {
    /// Short label of the variant (for logs).
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Call { .. } => "call",
            Message::Cast { .. } => "cast",
            Message::Info { .. } => "info",
            Message::Timer { .. } => "timer",
            Message::Event { .. } => "event",
            Message::EventDown(_) => "event_down",
            Message::Exit(_) => "exit",
        }
    }
}

/// Notification that an event's producer terminated or unregistered it.
///
/// Delivered at most once per subscription; the subscription is gone afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDown {
    pub event: Arc<str>,
    pub producer: ProcessId,
    pub reason: ExitReason,
}

/// Notification to a parent that one of its children terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: ProcessId,
    pub name: Option<Arc<str>>,
    pub reason: ExitReason,
}

/// One-shot reply slot attached to a [`Message::Call`].
#[derive(Debug)]
pub struct ReplyTo {
    tx: oneshot::Sender<Payload>,
}

impl ReplyTo {
    pub(crate) fn new() -> (Self, oneshot::Receiver<Payload>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Sends the reply. Returns `false` if the caller stopped waiting.
    pub fn send(self, reply: Payload) -> bool {
        self.tx.send(reply).is_ok()
    }
}
