use super::Node;
use crate::dht::Did;
use crate::dht::Interval;
use crate::dht::PeerRecord;
use crate::error::Error;
use crate::error::Result;

impl Node {
    /// Find the peer responsible for `key`, the first node at or after `key`
    /// clockwise.
    ///
    /// The walk is iterative: this node asks each hop for its successor and its
    /// closest preceding finger until `key` falls between a hop and its
    /// successor. A failed walk is retried once from the then-current successor,
    /// and the whole lookup is bounded by [super::RingConfig::lookup_timeout].
    pub async fn find_successor(&self, key: Did) -> Result<PeerRecord> {
        let budget = self.config.lookup_timeout();
        tokio::time::timeout(budget, self.route(key))
            .await
            .map_err(|_| Error::LookupTimeout(key))?
    }

    /// Serve `closest-preceding-finger`.
    pub fn closest_preceding_finger(&self, key: Did) -> Result<PeerRecord> {
        self.ring.closest_preceding(key)
    }

    async fn route(&self, key: Did) -> Result<PeerRecord> {
        let e = match self.walk(key).await {
            Ok(found) => return Ok(found),
            Err(e) => e,
        };
        tracing::debug!("[{}] lookup of {} failed, retrying: {}", self.peer(), key, e);
        self.walk(key).await
    }

    async fn walk(&self, key: Did) -> Result<PeerRecord> {
        let Some(successor) = self.ring.successor()? else {
            return Ok(self.peer().clone());
        };
        if key.is_between(self.did(), successor.id(), Interval::LeftOpen) {
            return Ok(successor);
        }

        let mut hop = self.ring.closest_preceding(key)?;
        if &hop == self.peer() {
            hop = successor.clone();
        }
        for _ in 0..self.config.max_lookup_hops {
            let hop_successor = match self.successor_of(&hop).await {
                Ok(Some(s)) => s,
                Ok(None) => return Ok(hop),
                Err(e) => return Err(self.drop_dead_hop(&hop, &successor, e)),
            };
            if key.is_between(hop.id(), hop_successor.id(), Interval::LeftOpen) {
                if &hop != self.peer() {
                    self.add_well_known_peer(hop_successor.clone());
                }
                return Ok(hop_successor);
            }
            let next = match self.closest_preceding_of(&hop, key).await {
                Ok(next) => next,
                Err(e) => return Err(self.drop_dead_hop(&hop, &successor, e)),
            };
            hop = if next == hop { hop_successor } else { next };
        }
        Err(Error::LookupExhausted(key, self.config.max_lookup_hops))
    }

    async fn successor_of(&self, hop: &PeerRecord) -> Result<Option<PeerRecord>> {
        if hop == self.peer() {
            return self.ring.successor();
        }
        self.remote(hop).successor().await
    }

    async fn closest_preceding_of(&self, hop: &PeerRecord, key: Did) -> Result<PeerRecord> {
        if hop == self.peer() {
            return self.ring.closest_preceding(key);
        }
        self.remote(hop).closest_preceding_finger(key).await
    }

    /// A dead successor is forgotten so the retry starts from the next one.
    fn drop_dead_hop(&self, hop: &PeerRecord, successor: &PeerRecord, e: Error) -> Error {
        if e.is_unreachable() && hop == successor {
            if let Err(err) = self.ring.remove_successor(hop) {
                tracing::error!("[{}] failed to drop successor {}: {}", self.peer(), hop, err);
            }
        }
        e
    }
}
