//! Lifecycle observability: record types and broadcast bus.
//!
//! ## Contents
//! - [`LifecycleKind`], [`LifecycleEvent`] classification and metadata
//! - [`LifecycleBus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: process loop, `Supervisor`, `EventBus`, `Runtime` shutdown,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::SubscriberSet)) and [`Runtime::lifecycle`](crate::Runtime::lifecycle).

mod bus;
mod event;

pub use bus::LifecycleBus;
pub use event::{LifecycleEvent, LifecycleKind};
