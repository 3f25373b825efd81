//! A running ring member.
//!
//! [Node] ties a [PeerRing] to a [FailureDetector] over some gateway and
//! implements everything that needs both: joining, lookup, departure, and the
//! inbound dispatcher [Node::handle_request].
use std::sync::Arc;

use dashmap::DashSet;
use futures::future::join;
use rand::seq::SliceRandom;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dht::Did;
use crate::dht::Interval;
use crate::dht::PeerRecord;
use crate::dht::PeerRing;
use crate::dht::PeerStatus;
use crate::dht::RingEvent;
use crate::dht::RingSnapshot;
use crate::dht::Stabilizer;
use crate::error::Result;
use crate::gateway::FailureDetector;
use crate::gateway::RemotePeer;
use crate::inspect::RingInspect;
use crate::message::HandlerRegistry;
use crate::message::Metadata;

mod builder;
mod join;
mod lookup;

pub use builder::NodeBuilder;
pub use builder::RingConfig;

pub struct Node {
    pub(crate) ring: Arc<PeerRing>,
    pub(crate) detector: FailureDetector,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) metadata: Metadata,
    pub(crate) well_known: DashSet<PeerRecord>,
    pub(crate) config: RingConfig,
    pub(crate) shutdown: CancellationToken,
}

impl Node {
    pub fn peer(&self) -> &PeerRecord {
        &self.ring.peer
    }

    pub fn did(&self) -> Did {
        self.ring.did()
    }

    pub fn ring(&self) -> &Arc<PeerRing> {
        &self.ring
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn status(&self) -> Result<PeerStatus> {
        self.ring.status()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn predecessor(&self) -> Result<Option<PeerRecord>> {
        self.ring.predecessor()
    }

    pub fn successor(&self) -> Result<Option<PeerRecord>> {
        self.ring.successor()
    }

    pub fn snapshot(&self) -> Result<RingSnapshot> {
        self.ring.snapshot()
    }

    pub fn inspect(&self) -> Result<RingInspect> {
        RingInspect::inspect(&self.ring)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RingEvent> {
        self.ring.subscribe()
    }

    /// Talk to `target` through this node's failure detector.
    pub fn remote<'a>(&'a self, target: &'a PeerRecord) -> RemotePeer<'a> {
        RemotePeer::new(&self.detector, target)
    }

    pub fn well_known_peers(&self) -> Vec<PeerRecord> {
        self.well_known.iter().map(|p| p.key().clone()).collect()
    }

    pub fn add_well_known_peer(&self, peer: PeerRecord) {
        if &peer != self.peer() {
            self.well_known.insert(peer);
        }
    }

    /// A random well-known peer other than this node.
    pub fn random_well_known_peer(&self) -> Option<PeerRecord> {
        let peers = self.well_known_peers();
        peers.choose(&mut rand::thread_rng()).cloned()
    }

    /// Token cancelled when the node shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn the stabilization loop. It ends when the node stops.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let stabilizer = Arc::new(Stabilizer::new(self.clone()));
        let interval = self.config.stabilize_interval;
        let token = self.shutdown.clone();
        tokio::spawn(async move { stabilizer.wait(interval, token).await })
    }

    /// Suppress future stabilization rounds without telling the neighbors.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Leave the ring gracefully: neighbors are told to splice this node out,
    /// then the position is vacated. Neighbor failures are logged only.
    pub async fn leave(&self) -> Result<()> {
        let Some(notice) = self.ring.begin_leave()? else {
            return Ok(());
        };
        tracing::info!("[{}] leaving the ring", self.peer());
        self.stop();

        let tell = |target: Option<PeerRecord>| {
            let notice = notice.clone();
            async move {
                let Some(target) = target else { return };
                if let Err(e) = self.remote(&target).depart(&notice).await {
                    tracing::warn!("[{}] failed to tell {} about departure: {}", self.peer(), target, e);
                }
            }
        };
        let successor = notice.successor.clone();
        let predecessor = notice.predecessor.clone().filter(|p| Some(p) != successor.as_ref());
        join(tell(successor), tell(predecessor)).await;

        self.ring.finish_stop()
    }

    /// Whether `key` falls in the arc this node is responsible for.
    pub fn is_responsible_for(&self, key: &str) -> Result<bool> {
        let snapshot = self.ring.snapshot()?;
        if snapshot.status == PeerStatus::Lonely {
            return Ok(true);
        }
        Ok(match snapshot.predecessor {
            Some(pred) => Did::from_key(key).is_between(pred.id(), self.did(), Interval::LeftOpen),
            None => false,
        })
    }

    /// Find the node responsible for `key` and fetch its metadata.
    pub async fn locate(&self, key: &str) -> Result<(PeerRecord, Metadata)> {
        let owner = self.find_successor(Did::from_key(key)).await?;
        if &owner == self.peer() {
            return Ok((owner, self.metadata.clone()));
        }
        let metadata = self.remote(&owner).metadata().await?;
        Ok((owner, metadata))
    }
}
