//! Successor list for PeerRing
use crate::dht::BiasId;
use crate::dht::Did;
use crate::dht::PeerRecord;

/// A sequence of successors for a node on the ring.
/// Keeping several successors lets a node survive the failure of the nearest one.
/// The list is ordered by clockwise distance from the node, so its head is the
/// successor, and it never holds the node itself.
#[derive(Debug, Clone)]
pub struct SuccessorSeq {
    did: Did,
    max: u8,
    successors: Vec<PeerRecord>,
}

impl SuccessorSeq {
    pub fn new(did: Did, max: u8) -> Self {
        Self {
            did,
            max: max.max(1),
            successors: vec![],
        }
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.did, did)
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.successors.len() >= self.max as usize
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn head(&self) -> Option<&PeerRecord> {
        self.successors.first()
    }

    pub fn list(&self) -> &[PeerRecord] {
        &self.successors
    }

    pub fn contains(&self, peer: &PeerRecord) -> bool {
        self.successors.contains(peer)
    }

    /// Insert a peer at its clockwise position. Returns false when the peer is
    /// self, already present, or falls off the end of a full list.
    pub fn update(&mut self, peer: PeerRecord) -> bool {
        if peer.id() == self.did || self.contains(&peer) {
            return false;
        }
        let bias = self.bias(peer.id());
        let pos = self
            .successors
            .iter()
            .position(|x| self.bias(x.id()) > bias)
            .unwrap_or(self.successors.len());
        if pos >= self.max as usize {
            return false;
        }
        self.successors.insert(pos, peer);
        self.successors.truncate(self.max as usize);
        true
    }

    /// Drop every entry and rebuild from `peers`.
    pub fn replace(&mut self, peers: impl IntoIterator<Item = PeerRecord>) {
        self.successors.clear();
        for peer in peers {
            self.update(peer);
        }
    }

    pub fn remove(&mut self, peer: &PeerRecord) -> bool {
        let before = self.successors.len();
        self.successors.retain(|x| x != peer);
        before != self.successors.len()
    }

    pub fn clear(&mut self) {
        self.successors.clear();
    }
}
