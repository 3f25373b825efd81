//! Human readable dump of a node's ring view.
use serde::Deserialize;
use serde::Serialize;

use crate::dht::PeerRing;
use crate::dht::PeerStatus;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingInspect {
    pub did: String,
    pub address: String,
    pub status: PeerStatus,
    #[serde(default)]
    pub predecessor: Option<String>,
    pub successors: Vec<String>,
    /// Runs of equal fingers as `(peer, first index, last index)`.
    pub finger_table: Vec<(Option<String>, u64, u64)>,
}

impl RingInspect {
    pub fn inspect(ring: &PeerRing) -> Result<Self> {
        let snapshot = ring.snapshot()?;
        let fingers = ring.fingers()?;
        Ok(Self {
            did: snapshot.peer.id().to_string(),
            address: snapshot.peer.address(),
            status: snapshot.status,
            predecessor: snapshot.predecessor.map(|p| p.address()),
            successors: snapshot.successors.iter().map(|p| p.address()).collect(),
            finger_table: compress_runs(fingers.into_iter().map(|f| f.map(|p| p.address()))),
        })
    }
}

/// Collapse consecutive equal items into `(item, first index, last index)`.
pub fn compress_runs<T>(iter: impl Iterator<Item = T>) -> Vec<(T, u64, u64)>
where T: PartialEq {
    let mut runs: Vec<(T, u64, u64)> = vec![];
    for (i, x) in iter.enumerate() {
        let i = i as u64;
        if let Some(last) = runs.last_mut() {
            if last.0 == x {
                last.2 = i;
                continue;
            }
        }
        runs.push((x, i, i));
    }
    runs
}
