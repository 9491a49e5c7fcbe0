//! In-memory fakes for [`crate::env::Clock`] and [`crate::env::Transport`], and a
//! tiny multi-node harness for driving end-to-end scenarios without any real
//! transport or wall clock. Enabled by the `test-support` feature (on by default),
//! the same way `flotsync_io`/`flotsync_data_types` gate their test scaffolding.
use crate::env::{Clock, Transport};
use crate::messages::{LocalResponse, PeerMessage};
use crate::node::{NodeConfig, StorageNode};
use crate::types::NodeId;
use std::cell::Cell as StdCell;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A clock whose reading is set explicitly by the test, rather than advancing
/// on its own. Satisfies [`Clock`] via interior mutability so it can be shared
/// by value while still letting the test move it forward.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<StdCell<i64>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, timestamp: i64) {
        self.0.set(timestamp);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.get()
    }
}

/// A single in-flight peer message, addressed for delivery by the harness.
pub struct Envelope {
    pub from: NodeId,
    pub to: NodeId,
    pub message: PeerMessage,
}

type PeerQueue = Rc<RefCell<VecDeque<Envelope>>>;

/// A [`Transport`] that enqueues peer sends onto a queue shared by every node in
/// the harness, and collects local responses per-node for the test to inspect.
pub struct QueueTransport {
    node_id: NodeId,
    queue: PeerQueue,
    pub local_outbox: Vec<LocalResponse>,
}

impl Transport for QueueTransport {
    fn send_peer(&mut self, to: &NodeId, message: PeerMessage) {
        self.queue.borrow_mut().push_back(Envelope {
            from: self.node_id.clone(),
            to: to.clone(),
            message,
        });
    }

    fn send_local(&mut self, message: LocalResponse) {
        self.local_outbox.push(message);
    }
}

/// A small cluster of [`StorageNode`]s sharing one peer-message queue, for
/// driving end-to-end GET/PUT/DELETE scenarios without any real networking.
pub struct Cluster {
    queue: PeerQueue,
    clock: ManualClock,
    nodes: Vec<(NodeId, StorageNode<ManualClock, QueueTransport>)>,
}

impl Cluster {
    /// Build a cluster where every node knows about every other (and itself).
    pub fn new(node_ids: &[&str]) -> Self {
        let queue: PeerQueue = Rc::new(RefCell::new(VecDeque::new()));
        let clock = ManualClock::new();
        let known_nodes: Vec<NodeId> = node_ids.iter().map(|s| NodeId::from(*s)).collect();
        let nodes = known_nodes
            .iter()
            .map(|node_id| {
                let config = NodeConfig::new(node_id.clone(), known_nodes.clone())
                    .expect("cluster is always built with a non-empty node list");
                let transport = QueueTransport {
                    node_id: node_id.clone(),
                    queue: queue.clone(),
                    local_outbox: Vec::new(),
                };
                (
                    node_id.clone(),
                    StorageNode::new(config, clock.clone(), transport),
                )
            })
            .collect();
        Self {
            queue,
            clock,
            nodes,
        }
    }

    pub fn set_time(&self, timestamp: i64) {
        self.clock.set(timestamp);
    }

    pub fn node_mut(&mut self, node_id: &str) -> &mut StorageNode<ManualClock, QueueTransport> {
        &mut self
            .nodes
            .iter_mut()
            .find(|(id, _)| id.as_str() == node_id)
            .unwrap_or_else(|| panic!("no such node: {node_id}"))
            .1
    }

    pub fn local_outbox(&self, node_id: &str) -> &[LocalResponse] {
        &self
            .nodes
            .iter()
            .find(|(id, _)| id.as_str() == node_id)
            .unwrap_or_else(|| panic!("no such node: {node_id}"))
            .1
            .transport()
            .local_outbox
    }

    /// Drain the shared peer queue, delivering every envelope to its destination
    /// node, until no messages remain or `max_steps` is exhausted (a safety net
    /// against an accidental infinite message-passing loop in a test).
    pub fn run_until_quiescent(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            let next = self.queue.borrow_mut().pop_front();
            let Some(envelope) = next else {
                return;
            };
            let to = envelope.to.as_str().to_string();
            self.node_mut(&to).handle_peer(envelope.message);
        }
        panic!("run_until_quiescent did not drain within {max_steps} steps");
    }

    /// Drop the next queued envelope instead of delivering it, simulating a lost
    /// message or a replica that missed an earlier write.
    pub fn drop_next(&mut self) -> Option<Envelope> {
        self.queue.borrow_mut().pop_front()
    }

    /// Drop every currently-queued envelope addressed to `node_id`, simulating a
    /// replica that is unreachable for this round of messages.
    pub fn drop_all_to(&mut self, node_id: &str) {
        self.queue.borrow_mut().retain(|e| e.to.as_str() != node_id);
    }
}
