//! Finger table of a node: shortcuts across the ring for lookups.
#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::Interval;
use crate::dht::PeerRecord;

/// Finger table of Chord DHT.
/// Entry `i` caches the successor of `did + 2^i`; it only shortens lookups and
/// is never needed for correctness.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FingerTable {
    did: Did,
    size: usize,
    finger: Vec<Option<PeerRecord>>,
    #[serde(skip)]
    fix_finger_index: usize,
}

impl FingerTable {
    /// builder
    pub fn new(did: Did, size: usize) -> Self {
        Self {
            did,
            size,
            finger: vec![None; size],
            fix_finger_index: 0,
        }
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// get length of filled entries
    pub fn len(&self) -> usize {
        self.finger.iter().flatten().count()
    }

    /// Get first filled entry
    pub fn first(&self) -> Option<PeerRecord> {
        self.finger.iter().flatten().next().cloned()
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<&PeerRecord> {
        self.finger.get(index).and_then(|x| x.as_ref())
    }

    /// setter
    pub fn set(&mut self, index: usize, peer: PeerRecord) {
        if index >= self.size {
            tracing::error!("set finger index out of range, index: {}", index);
            return;
        }
        if peer.id() == self.did {
            tracing::debug!("set finger table with self did, ignore it");
            return;
        }
        tracing::debug!("set finger table index: {} peer: {}", index, peer);
        self.finger[index] = Some(peer);
    }

    /// Index of the finger to refresh next. Cycles through the whole table.
    pub fn next_fix_index(&mut self) -> usize {
        let index = self.fix_finger_index;
        self.fix_finger_index = (index + 1) % self.size.max(1);
        index
    }

    /// Remove a peer. The slots it held take the entry right after its last
    /// occurrence, or None.
    pub fn remove(&mut self, peer: &PeerRecord) {
        let indexes: Vec<usize> = self
            .finger
            .iter()
            .enumerate()
            .filter(|(_, x)| x.as_ref() == Some(peer))
            .map(|(i, _)| i)
            .collect();

        if let (Some(&first), Some(&last)) = (indexes.first(), indexes.last()) {
            let fill = self.finger.get(last + 1).cloned().flatten();
            for slot in &mut self.finger[first..=last] {
                *slot = fill.clone();
            }
        }
    }

    /// Entry closest to `key` lying strictly between this node and `key`.
    pub fn closest_preceding(&self, key: Did) -> Option<PeerRecord> {
        self.finger
            .iter()
            .rev()
            .flatten()
            .find(|p| p.id().is_between(self.did, key, Interval::Open))
            .cloned()
    }

    /// Whether the peer occupies any slot.
    pub fn contains(&self, peer: &PeerRecord) -> bool {
        self.finger.iter().flatten().any(|x| x == peer)
    }

    /// get finger list
    pub fn list(&self) -> &Vec<Option<PeerRecord>> {
        &self.finger
    }
}
