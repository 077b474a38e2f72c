//! # Runtime: process table, services and the supervision tree root.
//!
//! A [`Runtime`] owns the shared services every process uses:
//!
//! ```text
//! Runtime
//!   ├─ Registry      pid/name ─► ProcessRef
//!   ├─ EventBus      named pub/sub + producer monitoring
//!   ├─ TimerService  send_after / cancel (one driver task)
//!   ├─ LifecycleBus  observability records ─► SubscriberSet
//!   └─ RuntimeConfig
//! ```
//!
//! ## Spawning
//! `spawn` registers the process, starts its task and waits for `init`:
//! the spawner learns about init failures synchronously, as a [`SpawnError`].
//!
//! ## Termination
//! When a process leaves its loop the runtime cancels its timers, drops its
//! event registrations and subscriptions, removes it from the registry and
//! sends [`Message::Exit`] to its parent.
//!
//! ## Shutdown path
//! ```text
//! termination_signal() or Runtime::shutdown()
//!     └─► publish(ShutdownRequested)
//!     └─► stop(Shutdown) every root process (supervisors stop their children)
//!     └─► wait up to cfg.grace:
//!            ├─ all terminated → publish(AllStoppedWithin)
//!            └─ timeout        → publish(GraceExceeded), RuntimeError::GraceExceeded
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use procvisor::{
//!     CallReply, Context, GenServer, HandlerError, Payload, ProcessId, Runtime,
//!     RuntimeConfig, Server,
//! };
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl GenServer for Echo {
//!     async fn handle_call(
//!         &mut self,
//!         _ctx: &Context,
//!         _from: Option<ProcessId>,
//!         request: Payload,
//!     ) -> Result<CallReply, HandlerError> {
//!         Ok(CallReply::reply(request))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rt = Runtime::new(RuntimeConfig::default());
//!     let echo = rt.spawn("echo", Server::new(Echo)).await?;
//!
//!     let answer = rt.call(echo.pid(), Payload::new(42_u32)).await?;
//!     assert_eq!(answer.downcast_ref::<u32>(), Some(&42));
//!
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{broadcast, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::actor::ProcessActor;
use crate::core::registry::Registry;
use crate::core::timer::TimerService;
use crate::core::{
    Behavior, ChildExit, Context, ExitReason, Message, Payload, ProcessId, ProcessRef, ReplyTo,
    RuntimeBuilder, RuntimeConfig, TimerId, shutdown,
};
use crate::error::{CallError, RuntimeError, SendError, SpawnError};
use crate::events::EventBus;
use crate::lifecycle::{LifecycleBus, LifecycleEvent, LifecycleKind};
use crate::subscribers::SubscriberSet;

pub(crate) struct RuntimeParts {
    pub cfg: RuntimeConfig,
    pub registry: Arc<Registry>,
    pub events: EventBus,
    pub timers: TimerService,
    pub lifecycle: LifecycleBus,
    pub subs: Arc<SubscriberSet>,
    pub token: CancellationToken,
}

struct RuntimeInner {
    cfg: RuntimeConfig,
    registry: Arc<Registry>,
    events: EventBus,
    timers: TimerService,
    lifecycle: LifecycleBus,
    /// Kept alive for the lifetime of the runtime; the listener holds its own handle.
    _subs: Arc<SubscriberSet>,
    /// Stops service tasks (timer driver, lifecycle listener).
    token: CancellationToken,
    closed: AtomicBool,
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Handle to a running actor runtime. Cheap to clone.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Creates a runtime with no lifecycle subscribers.
    ///
    /// Must be called within a Tokio runtime: service tasks are spawned immediately.
    pub fn new(cfg: RuntimeConfig) -> Self {
        RuntimeBuilder::new(cfg).build()
    }

    /// Returns a builder for a runtime with lifecycle subscribers.
    pub fn builder(cfg: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    pub(crate) fn from_parts(parts: RuntimeParts) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                cfg: parts.cfg,
                registry: parts.registry,
                events: parts.events,
                timers: parts.timers,
                lifecycle: parts.lifecycle,
                _subs: parts.subs,
                token: parts.token,
                closed: AtomicBool::new(false),
            }),
        }
    }

    // ---------------------------
    // Spawning
    // ---------------------------

    /// Spawns a named root process and waits for its `init`.
    pub async fn spawn<B: Behavior>(
        &self,
        name: impl Into<Arc<str>>,
        behavior: B,
    ) -> Result<ProcessRef, SpawnError> {
        self.spawn_process(Some(name.into()), None, Box::new(behavior), None)
            .await
    }

    /// Spawns an anonymous root process and waits for its `init`.
    pub async fn spawn_unnamed<B: Behavior>(&self, behavior: B) -> Result<ProcessRef, SpawnError> {
        self.spawn_process(None, None, Box::new(behavior), None)
            .await
    }

    /// Spawns a supervised child; with a `gate`, its loop starts once the gate is cancelled.
    pub(crate) async fn spawn_child(
        &self,
        parent: ProcessId,
        name: Arc<str>,
        behavior: Box<dyn Behavior>,
        gate: Option<CancellationToken>,
    ) -> Result<ProcessRef, SpawnError> {
        self.spawn_process(Some(name), Some(parent), behavior, gate)
            .await
    }

    async fn spawn_process(
        &self,
        name: Option<Arc<str>>,
        parent: Option<ProcessId>,
        behavior: Box<dyn Behavior>,
        gate: Option<CancellationToken>,
    ) -> Result<ProcessRef, SpawnError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(SpawnError::RuntimeClosed);
        }

        let (process, mailbox) = ProcessRef::new(name, parent);
        self.inner.registry.insert(process.clone())?;

        let ctx = Context::new(process.clone(), self.clone());
        let actor = ProcessActor::new(ctx, behavior, mailbox);
        let (started_tx, started_rx) = oneshot::channel();
        tokio::spawn(actor.run(started_tx, gate));

        match started_rx.await {
            Ok(Ok(())) => Ok(process),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(SpawnError::InitPanicked {
                name: process.display_name().to_string(),
                reason: "process task dropped during init".into(),
            }),
        }
    }

    // ---------------------------
    // Bootstrap
    // ---------------------------

    /// Spawns `root` and blocks until it terminates or a termination signal arrives.
    ///
    /// On a signal, performs [`shutdown`](Self::shutdown). An abnormal root exit
    /// (e.g. escalation reaching the top of the tree) is returned as
    /// [`RuntimeError::RootFailed`].
    pub async fn run<B: Behavior>(
        &self,
        name: impl Into<Arc<str>>,
        root: B,
    ) -> Result<ExitReason, RuntimeError> {
        let root = self.spawn(name, root).await?;
        info!(process = %root.display_name(), pid = %root.pid(), "root process started");

        tokio::select! {
            signal = shutdown::termination_signal() => {
                let signal = signal?;
                info!(signal, "termination signal received");
                self.shutdown().await?;
                Ok(root.wait().await)
            }
            reason = root.wait() => {
                if reason.is_abnormal() {
                    error!(process = %root.display_name(), reason = %reason, "root process failed");
                    Err(RuntimeError::RootFailed {
                        process: root.display_name().to_string(),
                        reason,
                    })
                } else {
                    info!(process = %root.display_name(), reason = %reason, "root process exited");
                    Ok(reason)
                }
            }
        }
    }

    /// Stops every root process with [`ExitReason::Shutdown`] and waits up to `cfg.grace`.
    ///
    /// After shutdown no new process can be spawned.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.inner.closed.store(true, Ordering::Release);
        self.inner
            .lifecycle
            .publish(LifecycleEvent::new(LifecycleKind::ShutdownRequested));

        let live = self.inner.registry.snapshot();
        info!(processes = live.len(), "shutdown requested");
        for root in live.iter().rev().filter(|p| p.parent().is_none()) {
            root.stop(ExitReason::Shutdown);
        }

        let grace = self.inner.cfg.grace;
        let all = join_all(live.iter().map(|p| p.wait()));
        let res = match time::timeout(grace, all).await {
            Ok(_) => {
                self.inner
                    .lifecycle
                    .publish(LifecycleEvent::new(LifecycleKind::AllStoppedWithin));
                info!("all processes stopped within grace");
                Ok(())
            }
            Err(_) => {
                let stuck: Vec<String> = self
                    .inner
                    .registry
                    .snapshot()
                    .iter()
                    .map(|p| p.display_name().to_string())
                    .collect();
                self.inner.lifecycle.publish(
                    LifecycleEvent::new(LifecycleKind::GraceExceeded)
                        .with_reason(stuck.join(", ")),
                );
                warn!(?grace, ?stuck, "grace period exceeded");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };

        self.inner.token.cancel();
        res
    }

    // ---------------------------
    // Lookup
    // ---------------------------

    pub fn process(&self, pid: ProcessId) -> Option<ProcessRef> {
        self.inner.registry.get(pid)
    }

    pub fn whereis(&self, name: &str) -> Option<ProcessId> {
        self.inner.registry.whereis(name)
    }

    /// Sorted ids of all live processes.
    pub fn processes(&self) -> Vec<ProcessId> {
        self.inner.registry.list()
    }

    // ---------------------------
    // Messaging
    // ---------------------------

    /// Sends an info message from outside any process.
    pub fn send(&self, to: ProcessId, payload: Payload) -> Result<(), SendError> {
        self.send_from(None, to, payload)
    }

    pub fn cast(&self, to: ProcessId, payload: Payload) -> Result<(), SendError> {
        self.cast_from(None, to, payload)
    }

    /// Synchronous request with the configured default timeout.
    pub async fn call(&self, to: ProcessId, request: Payload) -> Result<Payload, CallError> {
        self.call_from(None, to, request, self.inner.cfg.default_call_timeout())
            .await
    }

    pub async fn call_timeout(
        &self,
        to: ProcessId,
        request: Payload,
        timeout: Duration,
    ) -> Result<Payload, CallError> {
        self.call_from(None, to, request, Some(timeout)).await
    }

    /// Asks `pid` to stop. Returns `false` if it is gone or already stopping.
    pub fn stop(&self, pid: ProcessId, reason: ExitReason) -> bool {
        self.process(pid).is_some_and(|p| p.stop(reason))
    }

    pub(crate) fn send_from(
        &self,
        from: Option<ProcessId>,
        to: ProcessId,
        payload: Payload,
    ) -> Result<(), SendError> {
        self.inner.registry.send(to, Message::Info { from, payload })
    }

    pub(crate) fn cast_from(
        &self,
        from: Option<ProcessId>,
        to: ProcessId,
        payload: Payload,
    ) -> Result<(), SendError> {
        self.inner.registry.send(to, Message::Cast { from, payload })
    }

    pub(crate) async fn call_from(
        &self,
        from: Option<ProcessId>,
        to: ProcessId,
        request: Payload,
        timeout: Option<Duration>,
    ) -> Result<Payload, CallError> {
        let (reply, rx) = ReplyTo::new();
        self.inner.registry.send(
            to,
            Message::Call {
                from,
                request,
                reply,
            },
        )?;

        let res = match timeout {
            Some(limit) => time::timeout(limit, rx)
                .await
                .map_err(|_| CallError::Timeout {
                    pid: to,
                    timeout: limit,
                })?,
            None => rx.await,
        };
        res.map_err(|_| CallError::NoReply { pid: to })
    }

    // ---------------------------
    // Timers
    // ---------------------------

    pub fn send_after(&self, to: ProcessId, payload: Payload, delay: Duration) -> TimerId {
        self.inner.timers.send_after(to, payload, delay)
    }

    /// Cancels a timer; `false` if it already fired or was cancelled.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.inner.timers.cancel(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.pending()
    }

    // ---------------------------
    // Services
    // ---------------------------

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribes to lifecycle records published from now on.
    pub fn lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.lifecycle.subscribe()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.cfg
    }

    pub(crate) fn lifecycle_bus(&self) -> &LifecycleBus {
        &self.inner.lifecycle
    }

    // ---------------------------
    // Termination
    // ---------------------------

    /// Drops every resource held by `process` and marks it `Terminated`.
    pub(crate) fn release(&self, process: &ProcessRef, reason: ExitReason) {
        let pid = process.pid();
        let timers = self.inner.timers.cancel_target(pid);
        // Out of the registry first: the bus refuses pids it cannot find.
        self.inner.registry.remove(pid);
        self.inner.events.process_terminated(pid, &reason);
        process.mark_terminated(reason);

        if timers > 0 {
            debug!(pid = %pid, timers, "pending timers cancelled");
        }
    }

    /// Final step of a process that passed `init`: release, then notify the parent.
    pub(crate) fn exit(&self, process: &ProcessRef, reason: ExitReason) {
        self.release(process, reason.clone());

        if reason.is_abnormal() {
            warn!(pid = %process.pid(), process = %process.display_name(), reason = %reason, "process terminated");
        } else {
            debug!(pid = %process.pid(), process = %process.display_name(), reason = %reason, "process terminated");
        }

        if let Some(parent) = process.parent() {
            let exit = ChildExit {
                pid: process.pid(),
                name: process.name_arc(),
                reason: reason.clone(),
            };
            if self.inner.registry.send(parent, Message::Exit(exit)).is_err() {
                debug!(pid = %process.pid(), parent = %parent, "parent already gone");
            }
        }

        self.inner.lifecycle.publish(
            LifecycleEvent::new(LifecycleKind::ProcessTerminated)
                .with_pid(process.pid())
                .with_process(process.display_name())
                .with_parent(process.parent())
                .with_reason(reason.to_string()),
        );
    }
}
