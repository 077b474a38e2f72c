//! # Lifecycle subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! runtime ── publish(LifecycleEvent) ──► LifecycleBus ──► listener ──► SubscriberSet
//!                                                                        │
//!                                                     ┌──────────┬───────┴──┐
//!                                                     ▼          ▼          ▼
//!                                                 LogWriter   Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use procvisor::{LifecycleEvent, LifecycleKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct RestartCounter;
//!
//! #[async_trait]
//! impl Subscribe for RestartCounter {
//!     async fn on_event(&self, event: &LifecycleEvent) {
//!         if event.kind == LifecycleKind::ChildRestarted {
//!             // increment restart counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "restart-counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
