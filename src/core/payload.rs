//! # Opaque message payloads.
//!
//! The runtime never inspects what processes send each other. A [`Payload`]
//! is a cheaply cloneable, type-erased value; receivers downcast it back.
//!
//! ## Example
//! ```rust
//! use procvisor::Payload;
//!
//! let p = Payload::new(3_u32);
//! assert!(p.is::<u32>());
//! assert_eq!(p.downcast_ref::<u32>(), Some(&3));
//! assert_eq!(p.downcast_ref::<String>(), None);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased, shareable message value.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    tag: PayloadTag,
}

impl Payload {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            tag: PayloadTag::of::<T>(),
        }
    }

    /// True if the payload holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrows the value as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Name of the wrapped type (for diagnostics only).
    pub fn type_name(&self) -> &'static str {
        self.tag.name
    }

    /// Tag of the wrapped type.
    pub fn tag(&self) -> PayloadTag {
        self.tag
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload<{}>", self.tag.name)
    }
}

/// Type tag recorded when an event is registered.
///
/// Used for diagnostics: publishing a payload of another type is logged, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadTag {
    id: TypeId,
    name: &'static str,
}

impl PayloadTag {
    /// Tag for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type name behind the tag.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True if `payload` carries the tagged type.
    pub fn matches(&self, payload: &Payload) -> bool {
        payload.tag.id == self.id
    }
}
