//! Per-run object identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle of a detected object, unique within one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id sequence owned by a single detection run.
///
/// Ids start at 1 and are handed out in creation order. Two runs never share
/// an allocator, so concurrent runs cannot interfere with each other.
#[derive(Debug, Default)]
pub struct ObjectIdAllocator {
    last: u32,
}

impl ObjectIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ObjectId {
        self.last += 1;
        ObjectId(self.last)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut ids = ObjectIdAllocator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();

        assert_eq!(a.value(), 1);
        assert!(a < b && b < c);
        assert_eq!(ids.issued(), 3);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut first = ObjectIdAllocator::new();
        let mut second = ObjectIdAllocator::new();
        first.next_id();
        first.next_id();

        assert_eq!(second.next_id().value(), 1);
    }
}
