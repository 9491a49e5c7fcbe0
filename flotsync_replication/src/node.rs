//! The node: owns the local store and the pending-request table, and drives
//! both the coordinator and replica sides of the protocol.
use crate::cell::{Cell, CellValue};
use crate::env::{Clock, Transport};
use crate::errors::{NoKnownNodesSnafu, Result};
use crate::messages::{LocalRequest, LocalResponse, PeerMessage};
use crate::pending::{Operation, PendingRequest, PendingTable};
use crate::placement::replicas_of;
use crate::store::LocalStore;
use crate::types::{Key, NodeId, RequestId, Timestamp};
use snafu::ensure;

/// The fixed identity and membership a node is constructed with.
///
/// Mirrors the `Options`/`Options::DEFAULT` shape used throughout
/// `flotsync_discovery::services`, scaled down to the two things this core
/// actually needs: who we are, and who else is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    pub node_id: NodeId,
    pub known_nodes: Vec<NodeId>,
}

impl NodeConfig {
    /// Construct a config, requiring at least one known node (typically the
    /// node's own id, for a single-node deployment).
    pub fn new(node_id: NodeId, known_nodes: Vec<NodeId>) -> Result<Self> {
        ensure!(!known_nodes.is_empty(), NoKnownNodesSnafu);
        Ok(Self {
            node_id,
            known_nodes,
        })
    }
}

/// A single-threaded cooperative event handler for one node in the store.
///
/// Every call to [`handle_local`](Self::handle_local) or
/// [`handle_peer`](Self::handle_peer) runs to completion atomically with
/// respect to the others: there are no suspension points inside a handler, so
/// no locking is needed around `store` or `pending`.
pub struct StorageNode<C, T> {
    config: NodeConfig,
    store: LocalStore,
    pending: PendingTable,
    clock: C,
    transport: T,
}

impl<C, T> StorageNode<C, T>
where
    C: Clock,
    T: Transport,
{
    pub fn new(config: NodeConfig, clock: C, transport: T) -> Self {
        Self {
            config,
            store: LocalStore::new(),
            pending: PendingTable::new(),
            clock,
            transport,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.config.node_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The timer inbox. Reserved for future use; unused in the core.
    pub fn handle_timer(&mut self, _timer_name: &str) {}

    /// Dispatch a client operation arriving on the local inbox.
    pub fn handle_local(&mut self, request: LocalRequest) {
        match request {
            LocalRequest::Get { key, quorum } => self.start_get(key, quorum),
            LocalRequest::Put { key, value, quorum } => self.start_put(key, value, quorum),
            LocalRequest::Delete { key, quorum } => self.start_delete(key, quorum),
        }
    }

    /// Dispatch a message arriving on the peer inbox.
    pub fn handle_peer(&mut self, message: PeerMessage) {
        match message {
            PeerMessage::ReplicaGetReq {
                key,
                request_id,
                coordinator,
            } => self.handle_replica_get_req(key, request_id, coordinator),
            PeerMessage::ReplicaGetResp {
                request_id,
                replica,
                value,
                timestamp,
                ..
            } => self.record_and_maybe_finalize(Operation::Get, request_id, replica, Cell::new(value, timestamp)),
            PeerMessage::ReplicaPutReq {
                key,
                value,
                timestamp,
                request_id,
                coordinator,
            } => self.handle_replica_put_req(key, value, timestamp, request_id, coordinator),
            PeerMessage::ReplicaPutResp {
                request_id,
                replica,
                value,
                timestamp,
                ..
            } => self.record_and_maybe_finalize(Operation::Put, request_id, replica, Cell::new(value, timestamp)),
            PeerMessage::ReplicaDeleteReq {
                key,
                timestamp,
                request_id,
                coordinator,
            } => self.handle_replica_delete_req(key, timestamp, request_id, coordinator),
            PeerMessage::ReplicaDeleteResp {
                request_id,
                replica,
                value,
                timestamp,
                ..
            } => self.record_and_maybe_finalize(
                Operation::Delete,
                request_id,
                replica,
                Cell::new(value, timestamp),
            ),
            PeerMessage::ReplicaReadRepair {
                key,
                value,
                timestamp,
            } => {
                self.store.merge(key, Cell::new(value, timestamp));
            }
        }
    }

    fn next_request_id(&mut self, operation: Operation, key: Key, quorum: usize) -> (RequestId, crate::placement::ReplicaSet) {
        let replicas = replicas_of(&key, &self.config.known_nodes);
        let request_id = self
            .pending
            .insert(PendingRequest::new(operation, key, replicas.clone(), quorum));
        (request_id, replicas)
    }

    fn start_get(&mut self, key: Key, quorum: usize) {
        let (request_id, replicas) = self.next_request_id(Operation::Get, key.clone(), quorum);
        log::trace!(
            "{}: starting GET request {request_id} for {key:?} (quorum {quorum})",
            self.config.node_id
        );
        for replica in &replicas {
            self.transport.send_peer(
                replica,
                PeerMessage::ReplicaGetReq {
                    key: key.clone(),
                    request_id,
                    coordinator: self.config.node_id.clone(),
                },
            );
        }
    }

    fn start_put(&mut self, key: Key, value: CellValue, quorum: usize) {
        let timestamp = self.clock.now();
        let (request_id, replicas) = self.next_request_id(Operation::Put, key.clone(), quorum);
        log::trace!(
            "{}: starting PUT request {request_id} for {key:?} at t={timestamp} (quorum {quorum})",
            self.config.node_id
        );
        for replica in &replicas {
            self.transport.send_peer(
                replica,
                PeerMessage::ReplicaPutReq {
                    key: key.clone(),
                    value: value.clone(),
                    timestamp,
                    request_id,
                    coordinator: self.config.node_id.clone(),
                },
            );
        }
    }

    fn start_delete(&mut self, key: Key, quorum: usize) {
        let timestamp = self.clock.now();
        let (request_id, replicas) = self.next_request_id(Operation::Delete, key.clone(), quorum);
        log::trace!(
            "{}: starting DELETE request {request_id} for {key:?} at t={timestamp} (quorum {quorum})",
            self.config.node_id
        );
        for replica in &replicas {
            self.transport.send_peer(
                replica,
                PeerMessage::ReplicaDeleteReq {
                    key: key.clone(),
                    timestamp,
                    request_id,
                    coordinator: self.config.node_id.clone(),
                },
            );
        }
    }

    fn handle_replica_get_req(&mut self, key: Key, request_id: RequestId, coordinator: NodeId) {
        let cell = self.store.get(&key);
        self.transport.send_peer(
            &coordinator,
            PeerMessage::ReplicaGetResp {
                key,
                value: cell.value,
                timestamp: cell.timestamp,
                request_id,
                replica: self.config.node_id.clone(),
            },
        );
    }

    fn handle_replica_put_req(
        &mut self,
        key: Key,
        value: CellValue,
        timestamp: Timestamp,
        request_id: RequestId,
        coordinator: NodeId,
    ) {
        let merged = self.store.merge(key.clone(), Cell::new(value, timestamp));
        self.transport.send_peer(
            &coordinator,
            PeerMessage::ReplicaPutResp {
                key,
                value: merged.value,
                timestamp: merged.timestamp,
                request_id,
                replica: self.config.node_id.clone(),
            },
        );
    }

    fn handle_replica_delete_req(
        &mut self,
        key: Key,
        timestamp: Timestamp,
        request_id: RequestId,
        coordinator: NodeId,
    ) {
        let previous = self.store.delete_overwrite(key.clone(), timestamp);
        self.transport.send_peer(
            &coordinator,
            PeerMessage::ReplicaDeleteResp {
                key,
                value: previous.value,
                timestamp: previous.timestamp,
                request_id,
                replica: self.config.node_id.clone(),
            },
        );
    }

    /// Common tail of every `REPLICA_*_RESP` handler: look up the pending
    /// request, drop silently if it's unknown or the operation tag disagrees,
    /// record the response, and finalize once quorum is reached.
    fn record_and_maybe_finalize(
        &mut self,
        operation: Operation,
        request_id: RequestId,
        replica: NodeId,
        cell: Cell,
    ) {
        let Some(pending) = self.pending.get_mut(request_id) else {
            log::trace!(
                "{}: dropping response for unknown request {request_id}",
                self.config.node_id
            );
            return;
        };
        if pending.operation != operation {
            log::warn!(
                "{}: dropping response for request {request_id}: operation tag mismatch",
                self.config.node_id
            );
            return;
        }
        pending.record_response(replica, cell);
        let reached_quorum = pending.has_quorum();
        if reached_quorum {
            self.finalize(operation, request_id);
        }
    }

    fn finalize(&mut self, operation: Operation, request_id: RequestId) {
        let pending = self
            .pending
            .remove(request_id)
            .expect("finalize is only called right after a successful lookup");
        match operation {
            Operation::Get => self.finalize_get(pending),
            Operation::Put => self.finalize_put(pending),
            Operation::Delete => self.finalize_delete(pending),
        }
    }

    fn finalize_get(&mut self, pending: PendingRequest) {
        let winner = pending.winner();
        log::debug!(
            "{}: GET for {:?} converged on {:?}",
            self.config.node_id,
            pending.key,
            winner
        );
        for (replica, cell) in &pending.responses {
            if *cell < winner {
                self.transport.send_peer(
                    replica,
                    PeerMessage::ReplicaReadRepair {
                        key: pending.key.clone(),
                        value: winner.value.clone(),
                        timestamp: winner.timestamp,
                    },
                );
            }
        }
        self.transport.send_local(LocalResponse::GetResp {
            key: pending.key,
            value: winner.value,
        });
    }

    fn finalize_put(&mut self, pending: PendingRequest) {
        let winner = pending.winner();
        self.transport.send_local(LocalResponse::PutResp {
            key: pending.key,
            value: winner.value,
        });
    }

    fn finalize_delete(&mut self, pending: PendingRequest) {
        let winner = pending.winner();
        self.transport.send_local(LocalResponse::DeleteResp {
            key: pending.key,
            value: winner.value,
        });
    }
}
