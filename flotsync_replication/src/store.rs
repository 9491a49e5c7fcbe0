//! The per-node `Key -> Cell` mapping: the unit of replicated state.
use crate::cell::Cell;
use crate::types::{Key, Timestamp};
use std::collections::HashMap;

/// A node's local view of the replicated data.
///
/// Absence of a key is observationally equivalent to [`Cell::ABSENT`]; callers
/// never see a distinction between "never inserted" and "explicitly tombstoned
/// at the sentinel timestamp".
#[derive(Default, Debug)]
pub struct LocalStore {
    cells: HashMap<Key, Cell>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current cell for `key`, normalizing absence to [`Cell::ABSENT`].
    pub fn get(&self, key: &Key) -> Cell {
        self.cells.get(key).cloned().unwrap_or(Cell::ABSENT)
    }

    /// Merge `incoming` with the current cell under the reconciliation order and
    /// store the winner, returning it. Used by `REPLICA_PUT_REQ` and
    /// `REPLICA_READ_REPAIR`.
    pub fn merge(&mut self, key: Key, incoming: Cell) -> Cell {
        let current = self.get(&key);
        let winner = current.reconcile(incoming);
        self.cells.insert(key, winner.clone());
        winner
    }

    /// Unconditionally overwrite the cell for `key` with a tombstone at
    /// `timestamp`, returning the cell that was in place beforehand.
    ///
    /// Deliberately bypasses [`Cell::reconcile`]: an old-timestamped delete can
    /// therefore regress a key that has since been written with a newer
    /// timestamp. Read-repair and later higher-timestamped writes restore
    /// convergence across the quorum.
    pub fn delete_overwrite(&mut self, key: Key, timestamp: Timestamp) -> Cell {
        let previous = self.get(&key);
        self.cells.insert(key, Cell::tombstone_at(timestamp));
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    #[test]
    fn absent_key_reads_as_absent_cell() {
        let store = LocalStore::new();
        assert_eq!(store.get(&Key::from("missing")), Cell::ABSENT);
    }

    #[test]
    fn merge_stores_and_returns_the_winner() {
        let mut store = LocalStore::new();
        let winner = store.merge(Key::from("x"), Cell::new(CellValue::from("v1"), 1));
        assert_eq!(winner, Cell::new(CellValue::from("v1"), 1));
        assert_eq!(store.get(&Key::from("x")), winner);

        // A lower timestamp loses and does not clobber the stored cell.
        let winner2 = store.merge(Key::from("x"), Cell::new(CellValue::from("stale"), 0));
        assert_eq!(winner2, Cell::new(CellValue::from("v1"), 1));
    }

    #[test]
    fn delete_overwrite_returns_previous_and_bypasses_merge() {
        let mut store = LocalStore::new();
        store.merge(Key::from("x"), Cell::new(CellValue::from("v1"), 5));
        let previous = store.delete_overwrite(Key::from("x"), 1);
        assert_eq!(previous, Cell::new(CellValue::from("v1"), 5));
        // Even though 1 < 5, the tombstone overwrites unconditionally.
        assert_eq!(store.get(&Key::from("x")), Cell::tombstone_at(1));
    }
}
