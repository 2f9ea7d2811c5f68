//! Key and record-pointer types for AlderDB.
//!
//! The index maps host-supplied keys to opaque record locations. The host
//! owns both definitions: [`Key`] is a type alias it may retarget at any
//! totally ordered, copyable scalar, and [`RecordPointer`] is carried by
//! value and never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{PageId, RecordId};

/// Index key type supplied by the host.
///
/// Any totally ordered, equality-comparable, copyable scalar works; the
/// index compares keys with `<` and `==` only.
pub type Key = i64;

/// Opaque locator of a record in the host's storage.
///
/// The index stores and returns record pointers by value; it never looks
/// inside them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordPointer {
    /// Page the record lives on.
    pub page_id: PageId,
    /// Slot of the record within its page.
    pub record_id: RecordId,
}

impl RecordPointer {
    /// Creates a record pointer from its page and slot.
    #[inline]
    #[must_use]
    pub const fn new(page_id: PageId, record_id: RecordId) -> Self {
        Self { page_id, record_id }
    }
}

impl fmt::Debug for RecordPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordPointer({}, {})", self.page_id, self.record_id)
    }
}

impl fmt::Display for RecordPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_pointer() {
        let pointer = RecordPointer::new(PageId::new(3), RecordId::new(9));
        assert_eq!(pointer.page_id.as_u64(), 3);
        assert_eq!(pointer.record_id.as_u64(), 9);
        assert_eq!(pointer, RecordPointer::new(PageId::new(3), RecordId::new(9)));
    }

    #[test]
    fn test_display() {
        let pointer = RecordPointer::new(PageId::new(3), RecordId::new(9));
        assert_eq!(pointer.to_string(), "(3, 9)");
    }
}
