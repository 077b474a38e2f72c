//! # ProcessActor: the task behind one process.
//!
//! Drives one [`Behavior`] through its lifecycle and reports the result.
//!
//! ## Flow
//! ```text
//! spawn ──► ProcessActor::run()
//!
//!   init(ctx) ──Err/panic──► cleanup ─► Terminated ─► SpawnError to spawner
//!      │ Ok
//!      ▼
//!   Running ─► ack spawner ─► [wait for start gate]
//!      │
//!   loop {
//!     select! (biased) {
//!       stop token     → leave loop with requested reason
//!       mailbox.recv() → handle_message(ctx, msg)
//!                           ├─ Continue   → loop
//!                           ├─ Stop(r)    → leave loop with r
//!                           └─ Err/panic  → leave loop with Failure
//!     }
//!   }
//!      ▼
//!   Stopping ─► close mailbox ─► terminate(ctx, reason) ─► cleanup ─► Terminated
//!                                                            └─► Exit to parent
//! ```
//!
//! ## Rules
//! - Handlers of one process never run concurrently (one task, one loop).
//! - The stop token is observed only between messages; a running handler finishes first.
//! - `terminate` runs exactly once on every path that passed `init`.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::core::mailbox::Mailbox;
use crate::core::{Behavior, Context, Directive, ExitReason, ProcessStatus};
use crate::error::SpawnError;
use crate::lifecycle::{LifecycleEvent, LifecycleKind};
use crate::subscribers::panic_message;

pub(crate) struct ProcessActor {
    ctx: Context,
    behavior: Box<dyn Behavior>,
    mailbox: Mailbox,
}

impl ProcessActor {
    pub fn new(ctx: Context, behavior: Box<dyn Behavior>, mailbox: Mailbox) -> Self {
        Self {
            ctx,
            behavior,
            mailbox,
        }
    }

    /// Runs the process to completion.
    ///
    /// The outcome of `init` is sent on `started` before the loop begins. With a
    /// `gate`, the loop waits until the gate token is cancelled (released).
    pub async fn run(
        mut self,
        started: oneshot::Sender<Result<(), SpawnError>>,
        gate: Option<CancellationToken>,
    ) {
        if let Err(err) = self.init().await {
            self.abort_init(&err);
            let _ = started.send(Err(err));
            return;
        }

        let process = self.ctx.process().clone();
        process.set_status(ProcessStatus::Running);
        debug!(pid = %process.pid(), process = %process.display_name(), "process running");
        self.ctx.runtime().lifecycle_bus().publish(
            LifecycleEvent::new(LifecycleKind::ProcessSpawned)
                .with_pid(process.pid())
                .with_process(process.display_name())
                .with_parent(process.parent()),
        );
        let _ = started.send(Ok(()));

        if let Some(gate) = gate {
            tokio::select! {
                _ = gate.cancelled() => {}
                _ = process.stop_token().cancelled() => {}
            }
        }

        let reason = self.serve().await;
        self.finish(reason).await;
    }

    async fn init(&mut self) -> Result<(), SpawnError> {
        let name = self.ctx.process().display_name().to_string();
        let res = AssertUnwindSafe(self.behavior.init(&self.ctx))
            .catch_unwind()
            .await;

        match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(SpawnError::InitFailed {
                name,
                reason: err.reason().to_string(),
            }),
            Err(panic) => Err(SpawnError::InitPanicked {
                name,
                reason: panic_message(&*panic),
            }),
        }
    }

    /// Cleanup for a process whose `init` failed: no terminate, no parent notification.
    fn abort_init(&mut self, err: &SpawnError) {
        self.mailbox.close();
        let process = self.ctx.process();
        warn!(pid = %process.pid(), error = %err, "process init failed");
        self.ctx
            .runtime()
            .release(process, ExitReason::failure(err.to_string()));
        self.ctx.runtime().lifecycle_bus().publish(
            LifecycleEvent::new(LifecycleKind::ProcessInitFailed)
                .with_pid(process.pid())
                .with_process(process.display_name())
                .with_parent(process.parent())
                .with_reason(err.as_label()),
        );
    }

    /// Message loop; returns the reason the process is stopping with.
    async fn serve(&mut self) -> ExitReason {
        let stop = self.ctx.process().stop_token().clone();

        loop {
            let msg = tokio::select! {
                biased;
                _ = stop.cancelled() => return self.ctx.process().requested_stop(),
                msg = self.mailbox.recv() => match msg {
                    Some(msg) => msg,
                    None => return ExitReason::Kill,
                },
            };

            let kind = msg.kind();
            let res = AssertUnwindSafe(self.behavior.handle_message(&self.ctx, msg))
                .catch_unwind()
                .await;

            match res {
                Ok(Ok(Directive::Continue)) => {}
                Ok(Ok(Directive::Stop(reason))) => return reason,
                Ok(Err(err)) => {
                    warn!(
                        pid = %self.ctx.pid(),
                        message = kind,
                        error = %err,
                        label = err.as_label(),
                        "handler failed"
                    );
                    return ExitReason::failure(err.reason());
                }
                Err(panic) => {
                    let info = panic_message(&*panic);
                    error!(pid = %self.ctx.pid(), message = kind, panic = %info, "handler panicked");
                    return ExitReason::failure(format!("panic: {info}"));
                }
            }
        }
    }

    async fn finish(mut self, reason: ExitReason) {
        let process = self.ctx.process().clone();
        process.set_status(ProcessStatus::Stopping);
        self.mailbox.close();
        let dropped = self.mailbox.len();
        if dropped > 0 {
            debug!(pid = %process.pid(), dropped, reason = %reason, "unprocessed messages discarded");
        }

        let res = AssertUnwindSafe(self.behavior.terminate(&self.ctx, &reason))
            .catch_unwind()
            .await;
        if let Err(panic) = res {
            error!(pid = %process.pid(), panic = %panic_message(&*panic), "terminate panicked");
        }

        self.ctx.runtime().exit(&process, reason);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::core::{Message, Payload, Runtime, RuntimeConfig};
    use crate::error::{CallError, HandlerError};

    struct Tally(Arc<AtomicUsize>);

    #[async_trait]
    impl Behavior for Tally {
        async fn handle_message(
            &mut self,
            _ctx: &Context,
            _msg: Message,
        ) -> Result<Directive, HandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Directive::Continue)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gated_process_holds_its_mailbox_until_released() {
        let rt = Runtime::new(RuntimeConfig::default());
        let parent = rt
            .spawn_unnamed(Tally(Arc::default()))
            .await
            .expect("spawn");

        let handled = Arc::new(AtomicUsize::new(0));
        let gate = CancellationToken::new();
        let child = rt
            .spawn_child(
                parent.pid(),
                Arc::from("gated"),
                Box::new(Tally(Arc::clone(&handled))),
                Some(gate.clone()),
            )
            .await
            .expect("spawn");
        assert_eq!(child.status(), ProcessStatus::Running);

        rt.send(child.pid(), Payload::new(1u8)).expect("send");
        let err = rt
            .call_timeout(child.pid(), Payload::new(()), Duration::from_millis(50))
            .await
            .expect_err("gated");
        assert!(matches!(err, CallError::Timeout { .. }));
        assert_eq!(handled.load(Ordering::SeqCst), 0);

        gate.cancel();
        let err = rt
            .call(child.pid(), Payload::new(()))
            .await
            .expect_err("tally never replies");
        assert_eq!(err, CallError::NoReply { pid: child.pid() });
        assert_eq!(handled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gated_process_can_still_be_stopped() {
        let rt = Runtime::new(RuntimeConfig::default());
        let parent = rt
            .spawn_unnamed(Tally(Arc::default()))
            .await
            .expect("spawn");
        let child = rt
            .spawn_child(
                parent.pid(),
                Arc::from("gated"),
                Box::new(Tally(Arc::default())),
                Some(CancellationToken::new()),
            )
            .await
            .expect("spawn");

        assert!(child.stop(ExitReason::Shutdown));
        assert_eq!(child.wait().await, ExitReason::Shutdown);
        assert_eq!(rt.whereis("gated"), None);
    }
}
