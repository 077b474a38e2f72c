//! # GenServer: request/response worker callbacks.
//!
//! Implement [`GenServer`] and wrap it in [`Server`](crate::Server) to get a
//! process that dispatches its mailbox to typed callbacks:
//!
//! ```text
//! Message::Call      ─► handle_call        (reply sent from CallReply)
//! Message::Cast      ─► handle_cast
//! Message::Info      ─► handle_info
//! Message::Timer     ─► handle_timer       (default: handle_info)
//! Message::Event     ─► handle_event       (default: handle_info)
//! Message::EventDown ─► handle_event_down  (default: continue)
//! Message::Exit      ─► handle_exit        (default: continue)
//! ```
//!
//! Every callback has a default, so a server only implements what it handles.
//! Unhandled calls, casts and infos are logged at `warn` and ignored; an
//! unhandled call is answered with `()`.

use async_trait::async_trait;
use tracing::warn;

use crate::core::{
    ChildExit, Context, Directive, EventDown, ExitReason, Payload, ProcessId, TimerId,
};
use crate::error::HandlerError;

/// Result of [`GenServer::handle_call`]: the reply plus what to do next.
#[derive(Debug)]
pub struct CallReply {
    pub reply: Payload,
    pub directive: Directive,
}

impl CallReply {
    /// Replies and keeps running.
    pub fn reply(reply: Payload) -> Self {
        Self {
            reply,
            directive: Directive::Continue,
        }
    }

    /// Replies, then stops with `reason`.
    pub fn stop(reply: Payload, reason: ExitReason) -> Self {
        Self {
            reply,
            directive: Directive::Stop(reason),
        }
    }
}

/// Callbacks of a generic server process.
#[async_trait]
pub trait GenServer: Send + 'static {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        let _ = ctx;
        Ok(())
    }

    async fn handle_call(
        &mut self,
        ctx: &Context,
        from: Option<ProcessId>,
        request: Payload,
    ) -> Result<CallReply, HandlerError> {
        warn!(pid = %ctx.pid(), from = ?from, payload = request.type_name(), "unhandled call");
        Ok(CallReply::reply(Payload::new(())))
    }

    async fn handle_cast(
        &mut self,
        ctx: &Context,
        from: Option<ProcessId>,
        payload: Payload,
    ) -> Result<Directive, HandlerError> {
        warn!(pid = %ctx.pid(), from = ?from, payload = payload.type_name(), "unhandled cast");
        Ok(Directive::Continue)
    }

    async fn handle_info(
        &mut self,
        ctx: &Context,
        from: Option<ProcessId>,
        payload: Payload,
    ) -> Result<Directive, HandlerError> {
        warn!(pid = %ctx.pid(), from = ?from, payload = payload.type_name(), "unhandled info");
        Ok(Directive::Continue)
    }

    async fn handle_timer(
        &mut self,
        ctx: &Context,
        id: TimerId,
        payload: Payload,
    ) -> Result<Directive, HandlerError> {
        let _ = id;
        self.handle_info(ctx, Some(ctx.pid()), payload).await
    }

    async fn handle_event(
        &mut self,
        ctx: &Context,
        event: &str,
        producer: ProcessId,
        payload: Payload,
    ) -> Result<Directive, HandlerError> {
        let _ = event;
        self.handle_info(ctx, Some(producer), payload).await
    }

    /// The producer of a monitored event terminated or unregistered it.
    async fn handle_event_down(
        &mut self,
        ctx: &Context,
        down: EventDown,
    ) -> Result<Directive, HandlerError> {
        let _ = (ctx, down);
        Ok(Directive::Continue)
    }

    async fn handle_exit(
        &mut self,
        ctx: &Context,
        exit: ChildExit,
    ) -> Result<Directive, HandlerError> {
        let _ = (ctx, exit);
        Ok(Directive::Continue)
    }

    async fn terminate(&mut self, ctx: &Context, reason: &ExitReason) {
        let _ = (ctx, reason);
    }
}
