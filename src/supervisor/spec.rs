//! # Child and supervisor specifications.
//!
//! [`ChildSpec`] is the immutable template a supervisor uses to (re)spawn one
//! child: a name plus a factory producing a fresh behavior every time.
//! [`SupervisorSpec`] lists children in start order together with the
//! [`SupervisorStrategy`].
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{
//!     ChildSpec, GenServer, RestartPolicy, StrategyKind, SupervisorSpec, SupervisorStrategy,
//! };
//!
//! struct Worker;
//! impl GenServer for Worker {}
//!
//! let workers = SupervisorSpec::new("workers")
//!     .with_strategy(
//!         SupervisorStrategy::new(StrategyKind::OneForOne, 5, Duration::from_secs(5))
//!             .with_restart(RestartPolicy::Transient),
//!     )
//!     .with_child(ChildSpec::server("w1", || Worker))
//!     .with_child(ChildSpec::server("w2", || Worker));
//!
//! let app = SupervisorSpec::new("app").with_child(ChildSpec::supervisor(workers));
//! assert_eq!(app.children()[0].name(), "workers");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::core::{Behavior, BehaviorFactory};
use crate::policies::{RestartPolicy, SupervisorStrategy};
use crate::server::{GenServer, Server};
use crate::supervisor::Supervisor;

/// Template for one supervised child.
#[derive(Clone)]
pub struct ChildSpec {
    name: Arc<str>,
    factory: BehaviorFactory,
    restart: Option<RestartPolicy>,
}

impl ChildSpec {
    /// Child running any [`Behavior`] built by `factory`.
    pub fn new<F, B>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: Behavior,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Behavior>),
            restart: None,
        }
    }

    /// Child running a [`GenServer`] built by `factory`.
    pub fn server<F, S>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: GenServer,
    {
        Self::new(name, move || Server::new(factory()))
    }

    /// Nested supervisor; the child takes the supervisor's name.
    pub fn supervisor(spec: SupervisorSpec) -> Self {
        let name = Arc::clone(&spec.name);
        Self::new(name, move || Supervisor::new(spec.clone()))
    }

    /// Overrides the strategy-wide restart policy for this child.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = Some(restart);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn restart(&self) -> Option<RestartPolicy> {
        self.restart
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Produces a fresh behavior instance.
    pub(crate) fn build(&self) -> Box<dyn Behavior> {
        (self.factory)()
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("name", &self.name)
            .field("restart", &self.restart)
            .finish_non_exhaustive()
    }
}

/// Static description of a supervisor: name, strategy, children in start order.
#[derive(Clone, Debug)]
pub struct SupervisorSpec {
    name: Arc<str>,
    children: Vec<ChildSpec>,
    strategy: Option<SupervisorStrategy>,
}

impl SupervisorSpec {
    /// Creates an empty spec; the strategy defaults to `RuntimeConfig::default_strategy`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            strategy: None,
        }
    }

    pub fn with_child(mut self, child: ChildSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ChildSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_strategy(mut self, strategy: SupervisorStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[ChildSpec] {
        &self.children
    }

    pub fn strategy(&self) -> Option<SupervisorStrategy> {
        self.strategy
    }
}
