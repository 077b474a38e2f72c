//! Runtime core: processes, mailboxes, timers and the runtime handle.
//!
//! ## Wiring
//! ```text
//! Runtime::spawn(name, behavior)
//!   └─► Registry.insert(ProcessRef)           (name must be free)
//!   └─► tokio::spawn(ProcessActor::run)
//!          init ─► loop { mailbox.recv ─► handle_message } ─► terminate
//!          └─► Runtime::exit
//!                 ├─ TimerService.cancel_target(pid)
//!                 ├─ EventBus.process_terminated(pid)   (EventDown to subscribers)
//!                 ├─ Registry.remove(pid)
//!                 └─ Message::Exit ─► parent mailbox     (supervisor restarts)
//! ```
//!
//! Internal modules:
//! - `actor`: the per-process task (init, loop, terminate, panic isolation);
//! - `mailbox`: unbounded FIFO queue;
//! - `registry`: pid/name table;
//! - `timer`: deferred delivery;
//! - `shutdown`: OS signal handling.

mod actor;
mod behavior;
mod builder;
mod config;
mod context;
mod exit;
pub(crate) mod mailbox;
mod message;
mod payload;
mod pid;
mod process;
pub(crate) mod registry;
mod runtime;
mod shutdown;
mod timer;

pub use behavior::{Behavior, BehaviorFactory, Directive};
pub use builder::RuntimeBuilder;
pub use config::RuntimeConfig;
pub use context::Context;
pub use exit::{ExitReason, ProcessStatus};
pub use message::{ChildExit, EventDown, Message, ReplyTo};
pub use payload::{Payload, PayloadTag};
pub use pid::ProcessId;
pub use process::ProcessRef;
pub use runtime::Runtime;
pub use timer::TimerId;
