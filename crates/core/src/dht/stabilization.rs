//! Stabilization run daemons to maintain the ring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::consts::MIN_STABILIZE_INTERVAL;
use crate::dht::Interval;
use crate::dht::PeerRecord;
use crate::dht::PeerStatus;
use crate::error::Result;
use crate::node::Node;

/// The stabilization runner.
#[derive(Clone)]
pub struct Stabilizer {
    node: Arc<Node>,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Run stabilization once. Every step runs even if an earlier one failed.
    pub async fn stabilize(&self) -> Result<()> {
        if !self.node.status()?.is_active() {
            return Ok(());
        }
        tracing::debug!("STABILIZATION fix_successor start");
        if let Err(e) = self.fix_successor().await {
            tracing::error!("[stabilize] Failed on fix_successor {:?}", e);
        }
        tracing::debug!("STABILIZATION fix_successor end");
        tracing::debug!("STABILIZATION fix_successors start");
        if let Err(e) = self.fix_successors().await {
            tracing::error!("[stabilize] Failed on fix_successors {:?}", e);
        }
        tracing::debug!("STABILIZATION fix_successors end");
        tracing::debug!("STABILIZATION fix_predecessor start");
        if let Err(e) = self.fix_predecessor().await {
            tracing::error!("[stabilize] Failed on fix_predecessor {:?}", e);
        }
        tracing::debug!("STABILIZATION fix_predecessor end");
        if self.node.config().finger_table {
            tracing::debug!("STABILIZATION fix_fingers start");
            if let Err(e) = self.fix_fingers().await {
                tracing::error!("[stabilize] Failed on fix_fingers {:?}", e);
            }
            tracing::debug!("STABILIZATION fix_fingers end");
        }
        if let Err(e) = self.rejoin().await {
            tracing::error!("[stabilize] Failed on rejoin {:?}", e);
        }
        Ok(())
    }

    /// Adopt the successor's predecessor if it sits between us, then notify the
    /// successor. An unreachable successor is replaced by the next in the list,
    /// one that refuses the query is still notified.
    pub async fn fix_successor(&self) -> Result<()> {
        let ring = self.node.ring();
        let Some(successor) = ring.successor()? else {
            if let Some(predecessor) = ring.predecessor()? {
                ring.offer_successor(predecessor)?;
            }
            return Ok(());
        };

        match self.node.remote(&successor).predecessor().await {
            Ok(Some(candidate)) => {
                if candidate.id().is_between(self.node.did(), successor.id(), Interval::Open) {
                    ring.offer_successor(candidate)?;
                }
            }
            Ok(None) => {}
            Err(e) if e.is_unreachable() => {
                self.drop_successor(&successor)?;
                return Ok(());
            }
            // a successor that refuses the query is alive, keep notifying it
            Err(e) => tracing::warn!("[stabilize] predecessor of {} failed: {}", successor, e),
        }

        let Some(successor) = ring.successor()? else {
            return Ok(());
        };
        match self.node.remote(&successor).notify(self.node.peer()).await {
            Err(e) if e.is_unreachable() => self.drop_successor(&successor),
            r => r,
        }
    }

    /// Refresh the successor list from the successor's own list.
    pub async fn fix_successors(&self) -> Result<()> {
        let Some(successor) = self.node.successor()? else {
            return Ok(());
        };
        match self.node.remote(&successor).successors().await {
            Ok(list) => self.node.ring().refresh_successors(&successor, list),
            Err(e) if e.is_unreachable() => self.drop_successor(&successor),
            Err(e) => Err(e),
        }
    }

    /// Clear the predecessor if it stopped answering.
    pub async fn fix_predecessor(&self) -> Result<()> {
        let Some(predecessor) = self.node.predecessor()? else {
            return Ok(());
        };
        match self.node.remote(&predecessor).self_record().await {
            Err(e) if e.is_unreachable() => {
                tracing::info!("[stabilize] predecessor {} is dead", predecessor);
                self.node.ring().clear_predecessor(&predecessor)?;
                Ok(())
            }
            r => r.map(|_| ()),
        }
    }

    /// Refresh one finger per round.
    pub async fn fix_fingers(&self) -> Result<()> {
        if self.node.successor()?.is_none() {
            return Ok(());
        }
        let ring = self.node.ring();
        let index = ring.next_finger_index()?;
        let start = self.node.did().finger_start(index);
        let peer = self.node.find_successor(start).await?;
        ring.set_finger(index, peer)
    }

    /// A lonely node tries a random well-known peer.
    pub async fn rejoin(&self) -> Result<()> {
        if self.node.status()? != PeerStatus::Lonely {
            return Ok(());
        }
        let Some(peer) = self.node.random_well_known_peer() else {
            return Ok(());
        };
        self.node.join(peer).await.map(|_| ())
    }

    fn drop_successor(&self, dead: &PeerRecord) -> Result<()> {
        tracing::info!("[stabilize] successor {} is dead", dead);
        self.node.ring().remove_successor(dead)?;
        Ok(())
    }

    /// Run stabilization every `interval` until `token` is cancelled.
    /// A round that overruns makes the next ticks skip, never queue.
    /// Intervals below [MIN_STABILIZE_INTERVAL] are raised to it.
    pub async fn wait(self: Arc<Self>, interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval.max(MIN_STABILIZE_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("STABILIZATION stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.stabilize().await {
                        tracing::error!("failed to stabilize {:?}", e);
                    }
                }
            }
        }
    }
}
