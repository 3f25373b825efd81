//! Ring state of a single node.
#![warn(missing_docs)]
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use tokio::sync::broadcast;

use crate::consts::EVENT_CHANNEL_CAPACITY;
use crate::consts::RING_BITS;
use crate::dht::DepartNotice;
use crate::dht::Did;
use crate::dht::FingerTable;
use crate::dht::Interval;
use crate::dht::PeerRecord;
use crate::dht::PeerStatus;
use crate::dht::RingEvent;
use crate::dht::RingSnapshot;
use crate::dht::SuccessorSeq;
use crate::error::Error;
use crate::error::Result;

/// PeerRing is the local view a node has of its neighborhood on the ring.
///
/// All mutable fields live behind one [RwLock], so a transition replaces the
/// predecessor, the successor list and the status atomically and a reader always
/// gets a consistent [RingSnapshot]. The lock is never held across an await point:
/// every method here is synchronous and callers do their remote work in between.
///
/// Updates coming from remote peers are checked against the ring arcs before they
/// are applied. Only [PeerRing::complete_join] accepts an arbitrary peer, as the
/// provisional anchor of a fresh join.
pub struct PeerRing {
    /// This node. Never changes after construction.
    pub peer: PeerRecord,
    topology: RwLock<Topology>,
    events: broadcast::Sender<RingEvent>,
}

#[derive(Debug)]
struct Topology {
    status: PeerStatus,
    predecessor: Option<PeerRecord>,
    successors: SuccessorSeq,
    finger: FingerTable,
}

impl Topology {
    fn successor(&self) -> Option<PeerRecord> {
        self.successors.head().cloned()
    }

    /// A lonely or joined node is lonely exactly when it has no neighbor.
    fn settle(&mut self) {
        if matches!(self.status, PeerStatus::Lonely | PeerStatus::Joined) {
            self.status = if self.successors.is_empty() && self.predecessor.is_none() {
                PeerStatus::Lonely
            } else {
                PeerStatus::Joined
            };
        }
    }
}

fn fmt_peer(peer: &Option<PeerRecord>) -> String {
    match peer {
        Some(p) => p.to_string(),
        None => "none".to_string(),
    }
}

impl PeerRing {
    /// Create a lonely ring view for `peer` keeping up to `succ_max` successors.
    pub fn new(peer: PeerRecord, succ_max: u8) -> Self {
        let did = peer.id();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            peer,
            topology: RwLock::new(Topology {
                status: PeerStatus::Lonely,
                predecessor: None,
                successors: SuccessorSeq::new(did, succ_max),
                finger: FingerTable::new(did, RING_BITS),
            }),
            events,
        }
    }

    /// Did of this node.
    pub fn did(&self) -> Did {
        self.peer.id()
    }

    /// Receive every later [RingEvent].
    pub fn subscribe(&self) -> broadcast::Receiver<RingEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Topology>> {
        self.topology.read().map_err(|_| Error::RingStateLock)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Topology>> {
        self.topology.write().map_err(|_| Error::RingStateLock)
    }

    /// Apply one transition under the write lock, settle the status and publish
    /// whatever changed once the lock is released.
    fn transition<T>(&self, f: impl FnOnce(&mut Topology) -> T) -> Result<T> {
        let mut events = vec![];
        let ret = {
            let mut topo = self.write()?;
            let (status, predecessor, successor) =
                (topo.status, topo.predecessor.clone(), topo.successor());
            let ret = f(&mut topo);
            topo.settle();

            if topo.successor() != successor {
                tracing::info!(
                    "[{}] successor {} -> {}",
                    self.peer,
                    fmt_peer(&successor),
                    fmt_peer(&topo.successor())
                );
                events.push(RingEvent::SuccessorChanged(topo.successor()));
            }
            if topo.predecessor != predecessor {
                tracing::info!(
                    "[{}] predecessor {} -> {}",
                    self.peer,
                    fmt_peer(&predecessor),
                    fmt_peer(&topo.predecessor)
                );
                events.push(RingEvent::PredecessorChanged(topo.predecessor.clone()));
            }
            if topo.status != status {
                tracing::info!("[{}] status {} -> {}", self.peer, status, topo.status);
                events.push(RingEvent::StatusChanged {
                    from: status,
                    to: topo.status,
                });
            }
            ret
        };
        for event in events {
            // nobody listening is fine
            let _ = self.events.send(event);
        }
        Ok(ret)
    }

    /// Consistent copy of the whole view.
    pub fn snapshot(&self) -> Result<RingSnapshot> {
        let topo = self.read()?;
        Ok(RingSnapshot {
            peer: self.peer.clone(),
            status: topo.status,
            predecessor: topo.predecessor.clone(),
            successor: topo.successor(),
            successors: topo.successors.list().to_vec(),
        })
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Result<PeerStatus> {
        Ok(self.read()?.status)
    }

    /// Current predecessor.
    pub fn predecessor(&self) -> Result<Option<PeerRecord>> {
        Ok(self.read()?.predecessor.clone())
    }

    /// Current successor, the head of the successor list.
    pub fn successor(&self) -> Result<Option<PeerRecord>> {
        Ok(self.read()?.successor())
    }

    /// Successor list ordered clockwise.
    pub fn successors(&self) -> Result<Vec<PeerRecord>> {
        Ok(self.read()?.successors.list().to_vec())
    }

    /// Copy of the finger table slots.
    pub fn fingers(&self) -> Result<Vec<Option<PeerRecord>>> {
        Ok(self.read()?.finger.list().clone())
    }

    /// `lonely -> joining`. Returns false and changes nothing in any other status.
    pub fn begin_join(&self) -> Result<bool> {
        self.transition(|t| {
            if t.status != PeerStatus::Lonely {
                return false;
            }
            t.status = PeerStatus::Joining;
            true
        })
    }

    /// Adopt the answer of a join as provisional successor and move to `joined`.
    /// The predecessor is left for the first notify to fill in.
    pub fn complete_join(&self, successor: PeerRecord) -> Result<()> {
        let violation = successor == self.peer;
        self.transition(|t| {
            if t.status != PeerStatus::Joining {
                return Err(Error::InvalidStatus("complete join", t.status));
            }
            if violation {
                t.status = PeerStatus::Lonely;
                return Err(Error::ProtocolViolation(format!(
                    "join answered with the joining node {} itself",
                    self.peer
                )));
            }
            t.successors.replace(vec![successor]);
            t.predecessor = None;
            t.status = PeerStatus::Joined;
            Ok(())
        })?
    }

    /// `joining -> lonely` after a failed join.
    pub fn abort_join(&self) -> Result<()> {
        self.transition(|t| {
            if t.status == PeerStatus::Joining {
                t.status = PeerStatus::Lonely;
            }
        })
    }

    /// Consider `candidate` as successor. It is adopted when there is no
    /// successor yet or when it lies strictly between this node and the current one.
    pub fn offer_successor(&self, candidate: PeerRecord) -> Result<bool> {
        if candidate == self.peer {
            tracing::warn!(
                "[{}] ignored protocol violation: offered self as successor",
                self.peer
            );
            return Ok(false);
        }
        let did = self.did();
        self.transition(|t| {
            if !t.status.is_active() {
                return false;
            }
            match t.successor() {
                None => t.successors.update(candidate),
                Some(succ) if candidate.id().is_between(did, succ.id(), Interval::Open) => {
                    t.successors.update(candidate)
                }
                _ => false,
            }
        })
    }

    /// Handle `notify(candidate)`: accept it as predecessor when there is none or
    /// it lies strictly between the current predecessor and this node.
    /// A node without successor also takes the candidate as successor.
    pub fn notify(&self, candidate: PeerRecord) -> Result<bool> {
        if candidate == self.peer {
            tracing::warn!(
                "[{}] ignored protocol violation: notified by self",
                self.peer
            );
            return Ok(false);
        }
        let did = self.did();
        self.transition(|t| {
            if !t.status.is_active() {
                return false;
            }
            let accept = match &t.predecessor {
                None => true,
                Some(pred) => candidate.id().is_between(pred.id(), did, Interval::Open),
            };
            if t.successors.is_empty() {
                t.successors.update(candidate.clone());
            }
            if accept {
                t.predecessor = Some(candidate);
            }
            accept
        })
    }

    /// Rebuild the successor list from the list reported by the successor `head`.
    /// Ignored if `head` stopped being the successor meanwhile.
    pub fn refresh_successors(&self, head: &PeerRecord, list: Vec<PeerRecord>) -> Result<()> {
        let did = self.did();
        self.transition(|t| {
            if t.successor().as_ref() != Some(head) {
                return;
            }
            let head_bias = head.id().bias(did);
            let rest = list.into_iter().filter(|p| p.id().bias(did) > head_bias);
            t.successors
                .replace(std::iter::once(head.clone()).chain(rest));
        })
    }

    /// Forget a dead successor. The next entry of the successor list, or the
    /// nearest finger, takes over. Returns the new successor.
    pub fn remove_successor(&self, dead: &PeerRecord) -> Result<Option<PeerRecord>> {
        self.transition(|t| {
            t.successors.remove(dead);
            t.finger.remove(dead);
            if t.successors.is_empty() {
                if let Some(peer) = t.finger.first() {
                    t.successors.update(peer);
                }
            }
            t.successor()
        })
    }

    /// Forget a dead predecessor, unless it was replaced meanwhile.
    pub fn clear_predecessor(&self, dead: &PeerRecord) -> Result<bool> {
        self.transition(|t| {
            if t.predecessor.as_ref() == Some(dead) {
                t.predecessor = None;
                true
            } else {
                false
            }
        })
    }

    /// Splice out a neighbor that leaves gracefully.
    pub fn depart(&self, notice: DepartNotice) -> Result<()> {
        let me = self.peer.clone();
        self.transition(|t| {
            if t.predecessor.as_ref() == Some(&notice.peer) {
                t.predecessor = notice.predecessor.filter(|p| p != &me);
            }
            let was_successor = t.successors.head() == Some(&notice.peer);
            t.successors.remove(&notice.peer);
            t.finger.remove(&notice.peer);
            if was_successor {
                if let Some(next) = notice.successor.filter(|s| s != &me) {
                    t.successors.update(next);
                }
            }
        })
    }

    /// Index of the finger the next stabilization round refreshes.
    pub fn next_finger_index(&self) -> Result<usize> {
        Ok(self.write()?.finger.next_fix_index())
    }

    /// Store a finger.
    pub fn set_finger(&self, index: usize, peer: PeerRecord) -> Result<()> {
        self.write()?.finger.set(index, peer);
        Ok(())
    }

    /// Known peer closest to `key` that lies strictly between this node and `key`,
    /// or this node itself.
    pub fn closest_preceding(&self, key: Did) -> Result<PeerRecord> {
        let did = self.did();
        let topo = self.read()?;
        let mut best = topo.finger.closest_preceding(key);
        for succ in topo.successors.list() {
            if !succ.id().is_between(did, key, Interval::Open) {
                continue;
            }
            let closer = match &best {
                None => true,
                Some(b) => succ.id().is_between(b.id(), key, Interval::Open),
            };
            if closer {
                best = Some(succ.clone());
            }
        }
        Ok(best.unwrap_or_else(|| self.peer.clone()))
    }

    /// `-> leaving`. Returns the notice for the neighbors, or None when the node
    /// is already leaving or stopped.
    pub fn begin_leave(&self) -> Result<Option<DepartNotice>> {
        let me = self.peer.clone();
        self.transition(|t| {
            if !t.status.is_active() {
                return None;
            }
            t.status = PeerStatus::Leaving;
            Some(DepartNotice {
                peer: me,
                predecessor: t.predecessor.clone(),
                successor: t.successor(),
            })
        })
    }

    /// `-> stopped`, vacating the position.
    pub fn finish_stop(&self) -> Result<()> {
        let did = self.did();
        self.transition(|t| {
            t.status = PeerStatus::Stopped;
            t.predecessor = None;
            t.successors.clear();
            t.finger = FingerTable::new(did, RING_BITS);
        })
    }

    /// Overwrite the view, bypassing every check.
    #[cfg(test)]
    pub(crate) fn overwrite(
        &self,
        status: PeerStatus,
        predecessor: Option<PeerRecord>,
        successor: Option<PeerRecord>,
    ) -> Result<()> {
        let mut topo = self.write()?;
        topo.status = status;
        topo.predecessor = predecessor;
        topo.successors.clear();
        if let Some(succ) = successor {
            topo.successors.update(succ);
        }
        Ok(())
    }
}
