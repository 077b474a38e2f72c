//! # Supervisor behavior.
//!
//! A [`Supervisor`] is a process whose messages are the exit notifications of
//! its children. It owns one slot per [`ChildSpec`], in declaration order.
//!
//! ## Phases
//! ```text
//! Initializing ──all children up──► Supervising ──stop / escalation──► ShuttingDown ──► Terminated
//!      └──a child failed init: started ones stopped in reverse, spawn fails──────────────┘
//! ```
//!
//! ## On a child exit
//! ```text
//! Message::Exit(pid, reason)
//!   ├─ pid not in any slot            → stale (sibling stopped by us), ignored
//!   ├─ policy says no restart         → slot left empty
//!   └─ intensity.try_record(now)
//!        ├─ rejected → stop all children (reverse), Stop(Escalation)
//!        └─ admitted → [backoff] → stop affected live children (reverse)
//!                                → respawn affected in order, gated until all are up
//!                                → a respawn init failure counts as another restart
//! ```

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{
    Behavior, ChildExit, Context, Directive, ExitReason, Message, Payload, PayloadTag, ProcessId,
    ProcessRef, Runtime,
};
use crate::error::{CallError, HandlerError, SpawnError};
use crate::lifecycle::{LifecycleEvent, LifecycleKind};
use crate::policies::{RestartIntensity, RestartPolicy, SupervisorStrategy};
use crate::supervisor::{ChildSpec, SupervisorSpec};

/// Requests a supervisor answers through `call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorQuery {
    /// Replies with `Vec<ChildInfo>`.
    WhichChildren,
}

/// Snapshot of one child slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInfo {
    pub name: Arc<str>,
    /// `None` when the slot is empty (child not restarted).
    pub pid: Option<ProcessId>,
    pub restart: RestartPolicy,
}

/// Lists the children of the supervisor `pid`.
///
/// Fails with [`CallError::UnexpectedReply`] when `pid` is not a supervisor.
pub async fn which_children(
    runtime: &Runtime,
    supervisor: ProcessId,
) -> Result<Vec<ChildInfo>, CallError> {
    let reply = runtime
        .call(supervisor, Payload::new(SupervisorQuery::WhichChildren))
        .await?;
    reply
        .downcast_ref::<Vec<ChildInfo>>()
        .cloned()
        .ok_or_else(|| CallError::UnexpectedReply {
            pid: supervisor,
            expected: PayloadTag::of::<Vec<ChildInfo>>().name(),
            got: reply.type_name(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    Supervising,
    ShuttingDown,
    Terminated,
}

struct Slot {
    spec: ChildSpec,
    current: Option<ProcessRef>,
}

/// Behavior that starts, watches and restarts a static set of children.
pub struct Supervisor {
    spec: SupervisorSpec,
    strategy: SupervisorStrategy,
    intensity: RestartIntensity,
    slots: Vec<Slot>,
    phase: Phase,
}

impl Supervisor {
    pub fn new(spec: SupervisorSpec) -> Self {
        let strategy = spec.strategy().unwrap_or_default();
        let slots = spec
            .children()
            .iter()
            .cloned()
            .map(|spec| Slot {
                spec,
                current: None,
            })
            .collect();
        Self {
            intensity: RestartIntensity::new(strategy.max_restarts, strategy.period),
            strategy,
            slots,
            spec,
            phase: Phase::Initializing,
        }
    }

    fn policy(&self, idx: usize) -> RestartPolicy {
        self.slots[idx]
            .spec
            .restart()
            .unwrap_or(self.strategy.restart)
    }

    fn which_children(&self) -> Vec<ChildInfo> {
        (0..self.slots.len())
            .map(|idx| ChildInfo {
                name: self.slots[idx].spec.name_arc(),
                pid: self.slots[idx].current.as_ref().map(ProcessRef::pid),
                restart: self.policy(idx),
            })
            .collect()
    }

    async fn start_child(
        &mut self,
        ctx: &Context,
        idx: usize,
        gate: Option<CancellationToken>,
    ) -> Result<(), SpawnError> {
        let slot = &mut self.slots[idx];
        let child = ctx
            .runtime()
            .spawn_child(ctx.pid(), slot.spec.name_arc(), slot.spec.build(), gate)
            .await?;
        debug!(supervisor = self.spec.name(), child = slot.spec.name(), pid = %child.pid(), "child started");
        slot.current = Some(child);
        Ok(())
    }

    /// Stops the live children in `range`, last declared first, waiting for each.
    async fn stop_range(&mut self, range: Range<usize>) {
        for idx in range.rev() {
            if let Some(child) = self.slots[idx].current.take() {
                child.stop(ExitReason::Shutdown);
                child.wait().await;
            }
        }
    }

    /// Starts the children in `range` in order. With more than one child, none
    /// of them enters its loop before all passed `init`.
    async fn respawn(&mut self, ctx: &Context, range: Range<usize>) -> Result<(), SpawnError> {
        let gate = (range.len() > 1).then(CancellationToken::new);

        for idx in range.clone() {
            if let Err(err) = self.start_child(ctx, idx, gate.clone()).await {
                self.stop_range(range.start..idx).await;
                return Err(err);
            }
        }
        if let Some(gate) = gate {
            gate.cancel();
        }
        Ok(())
    }

    async fn on_child_exit(&mut self, ctx: &Context, exit: ChildExit) -> Directive {
        let found = self.slots.iter().position(|slot| {
            slot.current
                .as_ref()
                .is_some_and(|child| child.pid() == exit.pid)
        });
        let Some(idx) = found else {
            debug!(supervisor = self.spec.name(), pid = %exit.pid, "exit of a stale child ignored");
            return Directive::Continue;
        };
        self.slots[idx].current = None;

        if self.phase != Phase::Supervising {
            return Directive::Continue;
        }

        let policy = self.policy(idx);
        if !policy.should_restart(&exit.reason) {
            info!(
                supervisor = self.spec.name(),
                child = self.slots[idx].spec.name(),
                reason = %exit.reason,
                ?policy,
                "child terminated, not restarted"
            );
            return Directive::Continue;
        }

        self.restart(ctx, idx, exit.reason).await
    }

    async fn restart(&mut self, ctx: &Context, idx: usize, mut reason: ExitReason) -> Directive {
        let range = self.strategy.kind.affected(idx, self.slots.len());

        loop {
            let now = Instant::now();
            if !self.intensity.try_record(now) {
                return self.escalate(ctx, idx, &reason).await;
            }
            let restarts = self.intensity.in_window(now);

            if let Some(backoff) = self.strategy.backoff {
                let delay = backoff.delay(restarts.saturating_sub(1));
                debug!(supervisor = self.spec.name(), ?delay, "restart delayed");
                time::sleep(delay).await;
            }

            self.stop_range(range.clone()).await;
            match self.respawn(ctx, range.clone()).await {
                Ok(()) => {
                    let child = self.slots[idx].spec.name_arc();
                    info!(
                        supervisor = self.spec.name(),
                        child = %child,
                        restarts,
                        reason = %reason,
                        strategy = ?self.strategy.kind,
                        "child restarted"
                    );
                    ctx.runtime().lifecycle_bus().publish(
                        LifecycleEvent::new(LifecycleKind::ChildRestarted)
                            .with_pid(ctx.pid())
                            .with_process(ctx.process().display_name())
                            .with_child(child)
                            .with_attempt(restarts)
                            .with_reason(reason.to_string()),
                    );
                    return Directive::Continue;
                }
                Err(SpawnError::RuntimeClosed) => {
                    return Directive::Stop(ExitReason::Shutdown);
                }
                Err(err) => {
                    warn!(supervisor = self.spec.name(), error = %err, "restart failed");
                    reason = ExitReason::failure(err.to_string());
                }
            }
        }
    }

    async fn escalate(&mut self, ctx: &Context, idx: usize, reason: &ExitReason) -> Directive {
        let child = self.slots[idx].spec.name_arc();
        error!(
            supervisor = self.spec.name(),
            child = %child,
            max_restarts = self.strategy.max_restarts,
            period = ?self.strategy.period,
            reason = %reason,
            "restart intensity exceeded, escalating"
        );
        ctx.runtime().lifecycle_bus().publish(
            LifecycleEvent::new(LifecycleKind::RestartIntensityExceeded)
                .with_pid(ctx.pid())
                .with_process(ctx.process().display_name())
                .with_child(Arc::clone(&child))
                .with_reason(reason.to_string()),
        );

        self.phase = Phase::ShuttingDown;
        let len = self.slots.len();
        self.stop_range(0..len).await;

        Directive::Stop(ExitReason::Escalation(Arc::from(format!(
            "{}: restart intensity exceeded by {child} ({reason})",
            self.spec.name()
        ))))
    }
}

#[async_trait]
impl Behavior for Supervisor {
    async fn init(&mut self, ctx: &Context) -> Result<(), HandlerError> {
        if self.spec.strategy().is_none() {
            self.strategy = ctx.runtime().config().default_strategy;
            self.intensity =
                RestartIntensity::new(self.strategy.max_restarts, self.strategy.period);
        }

        for idx in 0..self.slots.len() {
            if let Err(err) = self.start_child(ctx, idx, None).await {
                self.stop_range(0..idx).await;
                self.phase = Phase::Terminated;
                return Err(HandlerError::fail(format!(
                    "child {:?} failed to start: {err}",
                    self.slots[idx].spec.name()
                )));
            }
        }

        self.phase = Phase::Supervising;
        info!(
            supervisor = self.spec.name(),
            children = self.slots.len(),
            strategy = ?self.strategy.kind,
            "supervisor started"
        );
        Ok(())
    }

    async fn handle_message(
        &mut self,
        ctx: &Context,
        msg: Message,
    ) -> Result<Directive, HandlerError> {
        match msg {
            Message::Exit(exit) => Ok(self.on_child_exit(ctx, exit).await),
            Message::Call { request, reply, .. } => {
                let answer = match request.downcast_ref::<SupervisorQuery>() {
                    Some(SupervisorQuery::WhichChildren) => Payload::new(self.which_children()),
                    None => {
                        warn!(supervisor = self.spec.name(), payload = request.type_name(), "unhandled call");
                        Payload::new(())
                    }
                };
                let _ = reply.send(answer);
                Ok(Directive::Continue)
            }
            other => {
                debug!(supervisor = self.spec.name(), message = other.kind(), "message ignored");
                Ok(Directive::Continue)
            }
        }
    }

    async fn terminate(&mut self, _ctx: &Context, reason: &ExitReason) {
        self.phase = Phase::ShuttingDown;
        let len = self.slots.len();
        self.stop_range(0..len).await;
        self.phase = Phase::Terminated;
        info!(supervisor = self.spec.name(), reason = %reason, "supervisor terminated");
    }
}
