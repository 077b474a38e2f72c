//! Supervision trees.
//!
//! ## Contents
//! - [`ChildSpec`], [`SupervisorSpec`] static description of a tree
//! - [`Supervisor`] the behavior that starts, watches and restarts children
//! - [`which_children`], [`ChildInfo`], [`SupervisorQuery`] introspection over `call`
//!
//! Child names are registered process names, so they must be unique among live
//! processes of the runtime.

mod engine;
mod spec;

pub use engine::{ChildInfo, Supervisor, SupervisorQuery, which_children};
pub use spec::{ChildSpec, SupervisorSpec};
