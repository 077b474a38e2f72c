//! Process-level events: named pub/sub between processes.
//!
//! Not to be confused with [`LifecycleEvent`](crate::LifecycleEvent), which carries
//! observability records about the runtime itself.
//!
//! ## Contents
//! - [`EventBus`] event registration, monitoring and fan-out delivery
//!
//! ## Quick reference
//! ```text
//! producer: ctx.register_event("notify", PayloadTag::of::<String>())
//!           ctx.publish("notify", payload)           ─► Message::Event to each subscriber
//! consumer: ctx.monitor_event("notify")
//! producer terminates                                ─► Message::EventDown to each subscriber (once)
//! ```

mod bus;

pub use bus::EventBus;
