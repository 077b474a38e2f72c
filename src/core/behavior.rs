//! # Behavior: what a process does with its messages.
//!
//! A [`Behavior`] is the polymorphic unit a process runs. The runtime drives it
//! through three callbacks:
//!
//! ```text
//! init(ctx)                 once, status Starting; Err → spawn fails
//! handle_message(ctx, msg)  once per mailbox message, never concurrently
//! terminate(ctx, reason)    exactly once after the loop ends
//! ```
//!
//! Higher-level behaviors ([`Server`](crate::Server), [`Supervisor`](crate::Supervisor))
//! implement this trait; most users never implement it directly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Context, ExitReason, Message};
use crate::error::HandlerError;

/// What the process loop does after a handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Go back to the mailbox.
    Continue,
    /// Leave the loop, run `terminate` with this reason.
    Stop(ExitReason),
}

/// Capability set of a process: init, message handling, terminate.
///
/// Panics and `Err` results from `handle_message` are caught by the process
/// loop and become [`ExitReason::Failure`]. A panic in `init` is reported as
/// [`SpawnError::InitPanicked`](crate::SpawnError::InitPanicked).
#[async_trait]
pub trait Behavior: Send + 'static {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        let _ = ctx;
        Ok(())
    }

    async fn handle_message(
        &mut self,
        ctx: &Context,
        msg: Message,
    ) -> Result<Directive, HandlerError>;

    async fn terminate(&mut self, ctx: &Context, reason: &ExitReason) {
        let _ = (ctx, reason);
    }
}

/// Produces a fresh behavior instance each time a child is (re)spawned.
pub type BehaviorFactory = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;
