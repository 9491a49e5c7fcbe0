//! Deterministic placement of a key onto its replica set.
use crate::types::{Key, NodeId};
use smallvec::SmallVec;

/// Number of replicas a key is placed on.
pub const REPLICATION_FACTOR: usize = 3;

/// The ordered set of nodes a key is replicated to, in dispatch order.
pub type ReplicaSet = SmallVec<[NodeId; REPLICATION_FACTOR]>;

/// Map `key` onto [`REPLICATION_FACTOR`] replica node ids out of `nodes`.
///
/// Hashes the key with MD5, reading the 16-byte digest as an unsigned
/// little-endian integer to pick a starting index into the lexicographically
/// sorted node list, then takes that many nodes walking forward with wraparound.
/// Pure and independent of the caller's own identity: the same `key` and the same
/// `nodes` (in any order) always produce the same replica set.
///
/// Panics if `nodes` is empty; an embedding is expected to validate that a node
/// always knows about at least itself (see [`crate::node::NodeConfig`]).
#[must_use]
pub fn replicas_of(key: &Key, nodes: &[NodeId]) -> ReplicaSet {
    assert!(
        !nodes.is_empty(),
        "replicas_of requires at least one known node"
    );
    let mut sorted: SmallVec<[&NodeId; 8]> = nodes.iter().collect();
    sorted.sort();

    let digest = md5::compute(key.as_bytes());
    let hash = u128::from_le_bytes(digest.0);
    let n = sorted.len();
    let start = (hash % n as u128) as usize;

    (0..REPLICATION_FACTOR)
        .map(|offset| (*sorted[(start + offset) % n]).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn nodes(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|s| NodeId::from(*s)).collect()
    }

    #[test]
    fn returns_exactly_replication_factor_entries() {
        let nodes = nodes(&["a", "b"]);
        let replicas = replicas_of(&Key::from("x"), &nodes);
        assert_eq!(replicas.len(), REPLICATION_FACTOR);
    }

    #[test]
    fn is_independent_of_input_order() {
        let sorted = nodes(&["a", "b", "c", "d"]);
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        assert_eq!(
            replicas_of(&Key::from("some-key"), &sorted),
            replicas_of(&Key::from("some-key"), &shuffled)
        );
    }

    #[test]
    fn wraps_and_may_duplicate_when_fewer_than_factor_nodes() {
        let nodes = nodes(&["only"]);
        let replicas = replicas_of(&Key::from("x"), &nodes);
        assert_eq!(replicas.len(), REPLICATION_FACTOR);
        assert!(replicas.iter().all(|r| r.as_str() == "only"));
    }

    proptest! {
        #[test]
        fn deterministic_for_fixed_inputs(key in "[a-z]{1,12}", n in 1usize..10) {
            let names: Vec<String> = (0..n).map(|i| format!("node-{i}")).collect();
            let nodes: Vec<NodeId> = names.iter().map(|s| NodeId::from(s.as_str())).collect();
            let key = Key::from(key.as_str());
            let first = replicas_of(&key, &nodes);
            let second = replicas_of(&key, &nodes);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn order_independent_for_shuffled_nodes(key in "[a-z]{1,12}", n in 1usize..10, seed in 0u64..1000) {
            let names: Vec<String> = (0..n).map(|i| format!("node-{i}")).collect();
            let mut nodes: Vec<NodeId> = names.iter().map(|s| NodeId::from(s.as_str())).collect();
            // A cheap deterministic shuffle: rotate by `seed`.
            nodes.rotate_left((seed as usize) % n.max(1));
            let key = Key::from(key.as_str());
            let baseline_nodes: Vec<NodeId> = names.iter().map(|s| NodeId::from(s.as_str())).collect();
            prop_assert_eq!(replicas_of(&key, &nodes), replicas_of(&key, &baseline_nodes));
        }
    }
}
