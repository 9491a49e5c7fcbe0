//! The reconciliation order over `(timestamp, value)` cells.
//!
//! This plays the same role that [`flotsync_core`'s happened-before order] plays for
//! vector-clock versions, but the "clock" here is a single scalar supplied by the
//! coordinator, so there is no `Concurrent`/`Incomparable` case to account for: the
//! order is total, and `reconcile` is simply taking the greater of the two cells.
use crate::types::{NEVER_WRITTEN, Timestamp};
use std::cmp::Ordering;
use std::fmt;

/// A value stored at a key, or the marker for its logical absence.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    Tombstone,
    Present(Box<[u8]>),
}

impl CellValue {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, CellValue::Tombstone)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CellValue::Tombstone => None,
            CellValue::Present(bytes) => Some(bytes),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Present(Box::from(value.as_bytes()))
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(value: Vec<u8>) -> Self {
        CellValue::Present(value.into_boxed_slice())
    }
}

impl fmt::Debug for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Tombstone => write!(f, "Tombstone"),
            CellValue::Present(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => write!(f, "Present({s:?})"),
                Err(_) => write!(f, "Present({bytes:?})"),
            },
        }
    }
}

/// The unit of replicated state for a key: a value-or-tombstone paired with the
/// timestamp at which it was written.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Cell {
    pub value: CellValue,
    pub timestamp: Timestamp,
}

impl Cell {
    /// The cell an absent key reads as: never written, no value.
    pub const ABSENT: Cell = Cell {
        value: CellValue::Tombstone,
        timestamp: NEVER_WRITTEN,
    };

    pub fn new(value: CellValue, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    pub fn tombstone_at(timestamp: Timestamp) -> Self {
        Self {
            value: CellValue::Tombstone,
            timestamp,
        }
    }

    /// Merge `self` with `other` under the total order: higher timestamp wins,
    /// equal timestamps break ties by the lexicographically greater value, with a
    /// tombstone acting as the additive identity at equal timestamps.
    ///
    /// Commutative, associative and idempotent, so folding it over an arbitrary
    /// set of cells always yields the same winner regardless of fold order.
    #[must_use]
    pub fn reconcile(self, other: Cell) -> Cell {
        if other > self { other } else { self }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.timestamp.cmp(&other.timestamp) {
            Ordering::Equal => match (&self.value, &other.value) {
                (CellValue::Tombstone, CellValue::Tombstone) => Ordering::Equal,
                (CellValue::Tombstone, CellValue::Present(_)) => Ordering::Less,
                (CellValue::Present(_), CellValue::Tombstone) => Ordering::Greater,
                (CellValue::Present(a), CellValue::Present(b)) => a.cmp(b),
            },
            ordering => ordering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cell(value: Option<&str>, timestamp: Timestamp) -> Cell {
        match value {
            Some(v) => Cell::new(CellValue::from(v), timestamp),
            None => Cell::tombstone_at(timestamp),
        }
    }

    #[test]
    fn higher_timestamp_wins() {
        let a = cell(Some("v1"), 1);
        let b = cell(Some("v2"), 2);
        assert_eq!(a.reconcile(b.clone()), b);
    }

    #[test]
    fn equal_timestamp_breaks_tie_on_value() {
        let apple = cell(Some("apple"), 5);
        let banana = cell(Some("banana"), 5);
        assert_eq!(apple.clone().reconcile(banana.clone()), banana);
        assert_eq!(banana.reconcile(apple), cell(Some("banana"), 5));
    }

    #[test]
    fn tombstone_is_identity_at_equal_timestamp() {
        let put = cell(Some("v1"), 9);
        let delete = cell(None, 9);
        assert_eq!(put.clone().reconcile(delete.clone()), put);
        assert_eq!(delete.reconcile(put.clone()), put);
    }

    #[test]
    fn both_tombstones_at_equal_timestamp_are_equal() {
        let a = cell(None, 3);
        let b = cell(None, 3);
        assert_eq!(a.reconcile(b.clone()), b);
    }

    proptest! {
        #[test]
        fn merge_is_commutative(
            ta in -5i64..5, va in proptest::option::of("[a-z]{1,4}"),
            tb in -5i64..5, vb in proptest::option::of("[a-z]{1,4}"),
        ) {
            let a = cell(va.as_deref(), ta);
            let b = cell(vb.as_deref(), tb);
            prop_assert_eq!(a.clone().reconcile(b.clone()), b.reconcile(a));
        }

        #[test]
        fn merge_is_idempotent(t in -5i64..5, v in proptest::option::of("[a-z]{1,4}")) {
            let a = cell(v.as_deref(), t);
            prop_assert_eq!(a.clone().reconcile(a.clone()), a);
        }

        #[test]
        fn merge_is_associative(
            ta in -3i64..3, va in proptest::option::of("[a-z]{1,3}"),
            tb in -3i64..3, vb in proptest::option::of("[a-z]{1,3}"),
            tc in -3i64..3, vc in proptest::option::of("[a-z]{1,3}"),
        ) {
            let a = cell(va.as_deref(), ta);
            let b = cell(vb.as_deref(), tb);
            let c = cell(vc.as_deref(), tc);
            let left = a.clone().reconcile(b.clone()).reconcile(c.clone());
            let right = a.reconcile(b.reconcile(c));
            prop_assert_eq!(left, right);
        }
    }
}
