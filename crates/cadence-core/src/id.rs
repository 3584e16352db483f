//! Stable identifiers for bindings, triggers and timer tasks

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out monotonically increasing raw ids.
///
/// Each registry owns its own allocator, so ids are unique per owner rather
/// than per process.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next raw id
    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $name(u64);

        impl $name {
            /// Allocate a fresh id
            pub fn next(alloc: &IdAllocator) -> Self {
                Self(alloc.next_raw())
            }

            /// Create an id from a raw value (for testing)
            pub fn from_raw(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw u64 value
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifies one registered key binding
    BindingId
);
define_id!(
    /// Identifies one entry in the trigger table
    TriggerId
);
define_id!(
    /// Identifies one task submitted to the timer worker
    TimerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_generation() {
        let alloc = IdAllocator::new();
        let id1 = BindingId::next(&alloc);
        let id2 = BindingId::next(&alloc);
        assert_ne!(id1, id2);
        assert!(id2.raw() > id1.raw());
    }

    #[test]
    fn allocators_are_independent() {
        let a = IdAllocator::new();
        let b = IdAllocator::new();
        assert_eq!(TriggerId::next(&a).raw(), 1);
        assert_eq!(TriggerId::next(&b).raw(), 1);
    }

    #[test]
    fn from_raw_and_format() {
        let id = TimerId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{id}"), "42");
        assert_eq!(format!("{id:?}"), "TimerId(42)");
    }
}
