//! # Per-process context.
//!
//! Every behavior callback receives a [`Context`]: the identity of the running
//! process plus the runtime services, already bound to that identity: messages
//! carry `from = self` and events are registered with `owner = self`.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{ExitReason, Payload, PayloadTag, ProcessId, ProcessRef, Runtime, TimerId};
use crate::error::{CallError, EventError, SendError};

/// Identity and services of the running process.
#[derive(Clone)]
pub struct Context {
    process: ProcessRef,
    runtime: Runtime,
}

impl Context {
    pub(crate) fn new(process: ProcessRef, runtime: Runtime) -> Self {
        Self { process, runtime }
    }

    pub fn pid(&self) -> ProcessId {
        self.process.pid()
    }

    pub fn name(&self) -> Option<&str> {
        self.process.name()
    }

    /// Supervisor (or other spawner) of this process; `None` for roots.
    pub fn parent(&self) -> Option<ProcessId> {
        self.process.parent()
    }

    pub fn process(&self) -> &ProcessRef {
        &self.process
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Requests this process to stop after the current handler returns.
    pub fn stop(&self, reason: ExitReason) -> bool {
        self.process.stop(reason)
    }

    // ---------------------------
    // Messaging
    // ---------------------------

    /// Sends an info message.
    pub fn send(&self, to: ProcessId, payload: Payload) -> Result<(), SendError> {
        self.runtime.send_from(Some(self.pid()), to, payload)
    }

    pub fn cast(&self, to: ProcessId, payload: Payload) -> Result<(), SendError> {
        self.runtime.cast_from(Some(self.pid()), to, payload)
    }

    /// Synchronous request with the runtime's default call timeout.
    pub async fn call(&self, to: ProcessId, request: Payload) -> Result<Payload, CallError> {
        let timeout = self.runtime.config().default_call_timeout();
        self.runtime
            .call_from(Some(self.pid()), to, request, timeout)
            .await
    }

    pub async fn call_timeout(
        &self,
        to: ProcessId,
        request: Payload,
        timeout: Duration,
    ) -> Result<Payload, CallError> {
        self.runtime
            .call_from(Some(self.pid()), to, request, Some(timeout))
            .await
    }

    pub fn whereis(&self, name: &str) -> Option<ProcessId> {
        self.runtime.whereis(name)
    }

    // ---------------------------
    // Timers
    // ---------------------------

    /// Delivers `payload` to `to` as a timer message after `delay`.
    pub fn send_after(&self, to: ProcessId, payload: Payload, delay: Duration) -> TimerId {
        self.runtime.send_after(to, payload, delay)
    }

    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.runtime.cancel_timer(id)
    }

    // ---------------------------
    // Events
    // ---------------------------

    /// Registers this process as the producer of `event`.
    pub fn register_event(
        &self,
        event: impl Into<Arc<str>>,
        tag: PayloadTag,
    ) -> Result<(), EventError> {
        self.runtime.events().register(self.pid(), event, tag)
    }

    pub fn unregister_event(&self, event: &str) -> Result<(), EventError> {
        self.runtime.events().unregister(self.pid(), event)
    }

    /// Subscribes to `event` and monitors its producer.
    pub fn monitor_event(&self, event: &str) -> Result<(), EventError> {
        self.runtime.events().subscribe(self.pid(), event)
    }

    pub fn demonitor_event(&self, event: &str) -> bool {
        self.runtime.events().unsubscribe(self.pid(), event)
    }

    /// Publishes to every subscriber of `event`; returns how many were reached.
    pub fn publish(&self, event: &str, payload: Payload) -> Result<usize, EventError> {
        self.runtime.events().publish(self.pid(), event, payload)
    }
}
