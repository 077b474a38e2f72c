//! Generic server behavior.
//!
//! ## Contents
//! - [`GenServer`] callbacks for call / cast / info / timer / event messages
//! - [`CallReply`] reply + directive returned from `handle_call`
//! - [`Server`] adapter turning a `GenServer` into a process [`Behavior`](crate::Behavior)

mod adapter;
mod gen_server;

pub use adapter::Server;
pub use gen_server::{CallReply, GenServer};
