//! In-flight client operations, tracked from creation to finalization.
use crate::cell::Cell;
use crate::placement::ReplicaSet;
use crate::types::{Key, NodeId, RequestId};
use std::collections::HashMap;

/// Which client operation a [`PendingRequest`] is driving to quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Get,
    Put,
    Delete,
}

/// One in-flight client operation on this node, tracked between dispatch and
/// finalization. Lives only between creation and the Q-th matching response;
/// there is no timeout-driven destruction.
#[derive(Debug)]
pub struct PendingRequest {
    pub operation: Operation,
    pub key: Key,
    pub replicas: ReplicaSet,
    pub quorum: usize,
    pub responses: HashMap<NodeId, Cell>,
}

impl PendingRequest {
    pub fn new(operation: Operation, key: Key, replicas: ReplicaSet, quorum: usize) -> Self {
        Self {
            operation,
            key,
            replicas,
            quorum,
            responses: HashMap::new(),
        }
    }

    /// Record a reply from `replica`, overwriting any earlier reply from the same
    /// replica (last-writer-wins on the response slot; duplicates are idempotent
    /// because only the count of *distinct* replicas gates quorum).
    pub fn record_response(&mut self, replica: NodeId, cell: Cell) {
        self.responses.insert(replica, cell);
    }

    pub fn has_quorum(&self) -> bool {
        self.responses.len() >= self.quorum
    }

    /// Fold every collected response through [`Cell::reconcile`] to find the
    /// single winning cell across the quorum.
    pub fn winner(&self) -> Cell {
        self.responses
            .values()
            .cloned()
            .fold(Cell::ABSENT, Cell::reconcile)
    }
}

/// The dense table of in-flight requests, keyed by `request_id`.
///
/// A plain hash map suffices at the scale a single node's concurrent request
/// count reaches; request ids are never reused within a node's uptime; any
/// generation-counter concern a slab allocator would guard against does not
/// arise.
#[derive(Default, Debug)]
pub struct PendingTable {
    requests: HashMap<RequestId, PendingRequest>,
    next_id: RequestId,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next `request_id` and register `request` under it.
    pub fn insert(&mut self, request: PendingRequest) -> RequestId {
        let request_id = self.next_id;
        self.next_id += 1;
        self.requests.insert(request_id, request);
        request_id
    }

    pub fn get_mut(&mut self, request_id: RequestId) -> Option<&mut PendingRequest> {
        self.requests.get_mut(&request_id)
    }

    /// Remove and return the request, used on finalization. A request for an
    /// unknown id (already finalized, or never existed) returns `None`.
    pub fn remove(&mut self, request_id: RequestId) -> Option<PendingRequest> {
        self.requests.remove(&request_id)
    }
}
