//! The message catalogue: dynamic records become tagged variants of an
//! exhaustively-matched sum type, one enum per direction.
use crate::cell::CellValue;
use crate::types::{Key, NodeId, RequestId, Timestamp};

/// Client operations arriving on the local inbox, addressed to this node acting
/// as coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalRequest {
    Get { key: Key, quorum: usize },
    Put { key: Key, value: CellValue, quorum: usize },
    Delete { key: Key, quorum: usize },
}

/// Client-facing responses emitted on the local outbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalResponse {
    GetResp { key: Key, value: CellValue },
    /// The value witnessed by the quorum, which may differ from the value the
    /// client submitted if a higher-timestamped write won the race.
    PutResp { key: Key, value: CellValue },
    /// The value the quorum observed immediately prior to the delete.
    DeleteResp { key: Key, value: CellValue },
}

/// Messages exchanged between nodes on the peer inbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerMessage {
    ReplicaGetReq {
        key: Key,
        request_id: RequestId,
        coordinator: NodeId,
    },
    ReplicaGetResp {
        key: Key,
        value: CellValue,
        timestamp: Timestamp,
        request_id: RequestId,
        replica: NodeId,
    },
    ReplicaPutReq {
        key: Key,
        value: CellValue,
        timestamp: Timestamp,
        request_id: RequestId,
        coordinator: NodeId,
    },
    ReplicaPutResp {
        key: Key,
        value: CellValue,
        timestamp: Timestamp,
        request_id: RequestId,
        replica: NodeId,
    },
    ReplicaDeleteReq {
        key: Key,
        timestamp: Timestamp,
        request_id: RequestId,
        coordinator: NodeId,
    },
    ReplicaDeleteResp {
        key: Key,
        value: CellValue,
        timestamp: Timestamp,
        request_id: RequestId,
        replica: NodeId,
    },
    /// Piggybacked on GET finalization; no reply is expected.
    ReplicaReadRepair {
        key: Key,
        value: CellValue,
        timestamp: Timestamp,
    },
}
