//! # procvisor
//!
//! **Procvisor** is a minimal actor supervision runtime on top of Tokio.
//!
//! Processes are isolated tasks with a mailbox and a [`Behavior`]. They talk by
//! message passing only, schedule deferred messages through the timer service,
//! publish and monitor named events, and are arranged in supervision trees that
//! restart failed subtrees under a bounded restart budget.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                        Runtime::run("appSup", Supervisor::new(spec))
//!                                          │
//!                                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime                                                          │
//! │  - Registry      (pid/name ─► process)                            │
//! │  - EventBus      (named pub/sub + producer monitoring)            │
//! │  - TimerService  (send_after / cancel)                            │
//! │  - LifecycleBus  (observability records ─► SubscriberSet)         │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//!   ┌──────────┐  OneForAll
//!   │  appSup  │────────────────────┐
//!   └────┬─────┘                    ▼
//!        ▼                 ┌───────────────────┐  OneForOne
//!   ┌──────────┐           │ consumerWorkersSup│──────┬──────────┬──────────┐
//!   │ producer │           └───────────────────┘      ▼          ▼          ▼
//!   └────┬─────┘                                   cons01     cons02     cons03
//!        │ publish("notify", ..)                      ▲          ▲          ▲
//!        └────────────── EventBus ────────────────────┴──────────┴──────────┘
//! ```
//!
//! ### Process lifecycle
//! ```text
//! Starting ──init ok──► Running ──handler returns Stop / stop() / handler error──► Stopping
//!    │                                                                                │
//!    └──init failed (SpawnError to the spawner)──► Terminated ◄──terminate(reason)────┘
//!                                                      │
//!                                                      ├─► timers cancelled, events dropped
//!                                                      └─► Message::Exit ─► parent supervisor
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                               |
//! |-------------------|-----------------------------------------------------------------|--------------------------------------------------|
//! | **Processes**     | Mailbox-driven behaviors with cooperative stop.                 | [`Behavior`], [`Context`], [`ProcessRef`]        |
//! | **Servers**       | Call / cast / info dispatch with typed callbacks.               | [`GenServer`], [`Server`], [`CallReply`]         |
//! | **Supervision**   | One-for-one, one-for-all, rest-for-one with restart budget.     | [`Supervisor`], [`SupervisorSpec`], [`ChildSpec`]|
//! | **Events**        | Named pub/sub with producer-death notification.                 | [`EventBus`], [`EventDown`]                      |
//! | **Policies**      | Restart, intensity, backoff and jitter.                         | [`RestartPolicy`], [`SupervisorStrategy`]        |
//! | **Observability** | Lifecycle records fanned out to subscribers.                    | [`Subscribe`], [`LifecycleEvent`]                |
//! | **Errors**        | Typed errors for spawn, messaging, events and runtime.          | [`SpawnError`], [`EventError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber rendering lifecycle records via `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{
//!     ChildSpec, GenServer, Runtime, RuntimeConfig, StrategyKind, Supervisor, SupervisorSpec,
//!     SupervisorStrategy, which_children,
//! };
//!
//! struct Worker;
//! impl GenServer for Worker {}
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rt = Runtime::new(RuntimeConfig::default());
//!
//!     let spec = SupervisorSpec::new("workers")
//!         .with_strategy(SupervisorStrategy::new(StrategyKind::OneForOne, 3, Duration::from_secs(5)))
//!         .with_child(ChildSpec::server("w1", || Worker))
//!         .with_child(ChildSpec::server("w2", || Worker));
//!
//!     let sup = rt.spawn("workers", Supervisor::new(spec)).await?;
//!     let children = which_children(&rt, sup.pid()).await?;
//!     assert_eq!(children.len(), 2);
//!     assert!(rt.whereis("w1").is_some());
//!
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod lifecycle;
mod policies;
mod server;
mod subscribers;
mod supervisor;

// ---- Public re-exports ----

pub use crate::core::{
    Behavior, BehaviorFactory, ChildExit, Context, Directive, EventDown, ExitReason, Message,
    Payload, PayloadTag, ProcessId, ProcessRef, ProcessStatus, ReplyTo, Runtime, RuntimeBuilder,
    RuntimeConfig, TimerId,
};
pub use error::{CallError, EventError, HandlerError, RuntimeError, SendError, SpawnError};
pub use events::EventBus;
pub use lifecycle::{LifecycleBus, LifecycleEvent, LifecycleKind};
pub use policies::{
    BackoffPolicy, JitterPolicy, RestartIntensity, RestartPolicy, StrategyKind, SupervisorStrategy,
};
pub use server::{CallReply, GenServer, Server};
pub use subscribers::{Subscribe, SubscriberSet};
pub use supervisor::{
    ChildInfo, ChildSpec, Supervisor, SupervisorQuery, SupervisorSpec, which_children,
};

// Built-in subscriber writing lifecycle records through `tracing`.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
