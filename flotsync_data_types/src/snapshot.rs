//! Format-agnostic snapshot streaming API.
//!
//! Serializers can consume snapshot nodes in canonical order via [[SnapshotSink]]
//! without depending on internal storage types.

/// Snapshot stream header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Total number of nodes that will be emitted.
    pub node_count: usize,
}

/// A single snapshot node borrowed from an in-memory CRDT state.
///
/// Invariants for emitted streams:
/// - Nodes are emitted in canonical order.
/// - `index == 0` and `index == node_count - 1` are boundary nodes.
/// - Boundary nodes have `value == None` and `deleted == false`.
/// - Non-boundary nodes have `left/right/value == Some(_)`.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotNodeRef<'a, Id, Value: ?Sized> {
    pub id: &'a Id,
    pub left: Option<&'a Id>,
    pub right: Option<&'a Id>,
    /// `true` for tombstone nodes, `false` for visible insert nodes.
    pub deleted: bool,
    pub value: Option<&'a Value>,
}

/// An owned snapshot node used during deserialization.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotNode<Id, Value> {
    pub id: Id,
    pub left: Option<Id>,
    pub right: Option<Id>,
    /// `true` for tombstone nodes, `false` for visible insert nodes.
    pub deleted: bool,
    pub value: Option<Value>,
}

/// Errors while reading/reconstructing snapshots.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotReadError<E> {
    Source(E),
    MissingBoundaryNodes,
    BoundaryNodeHasLeft { index: usize },
    BoundaryNodeHasRight { index: usize },
    BoundaryNodeHasValue { index: usize },
    BoundaryNodeMarkedDeleted { index: usize },
    NonBoundaryNodeMissingLeft { index: usize },
    NonBoundaryNodeMissingRight { index: usize },
    NonBoundaryNodeMissingValue { index: usize },
    NoVisibleValues,
}
impl<E> SnapshotReadError<E> {
    pub fn from_source(source: E) -> Self {
        Self::Source(source)
    }
}

/// Sink that receives a snapshot stream.
pub trait SnapshotSink<Id, Value: ?Sized> {
    type Error;

    fn begin(&mut self, header: SnapshotHeader) -> Result<(), Self::Error>;

    fn node(
        &mut self,
        index: usize,
        node: SnapshotNodeRef<'_, Id, Value>,
    ) -> Result<(), Self::Error>;

    fn end(&mut self) -> Result<(), Self::Error>;
}
