//! In-memory gateway connecting nodes living in one process.
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::DashSet;
use serde_json::Value;

use super::CallFailure;
use super::Operation;
use super::RemoteGateway;
use crate::dht::PeerRecord;
use crate::node::Node;

/// Routes calls straight into [Node::handle_request] of registered nodes.
///
/// Nodes are held weakly, a dropped node simply becomes unreachable. Peers can be
/// switched offline to simulate crashes and partitions.
#[derive(Default)]
pub struct LocalNetwork {
    nodes: DashMap<String, Weak<Node>>,
    offline: DashSet<String>,
}

impl LocalNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, node: &Arc<Node>) {
        self.nodes
            .insert(node.peer().address(), Arc::downgrade(node));
    }

    pub fn unregister(&self, peer: &PeerRecord) {
        self.nodes.remove(&peer.address());
    }

    pub fn set_offline(&self, peer: &PeerRecord, offline: bool) {
        if offline {
            self.offline.insert(peer.address());
        } else {
            self.offline.remove(&peer.address());
        }
    }

    fn resolve(&self, peer: &PeerRecord) -> Option<Arc<Node>> {
        let addr = peer.address();
        if self.offline.contains(&addr) {
            return None;
        }
        self.nodes.get(&addr).and_then(|n| n.value().upgrade())
    }
}

#[async_trait]
impl RemoteGateway for LocalNetwork {
    async fn call(
        &self,
        target: &PeerRecord,
        operation: &Operation,
        payload: Value,
    ) -> Result<Value, CallFailure> {
        let node = self
            .resolve(target)
            .ok_or_else(|| CallFailure::Unreachable(format!("{} is offline", target)))?;
        node.handle_request(operation, payload)
            .await
            .map_err(CallFailure::from)
    }
}
