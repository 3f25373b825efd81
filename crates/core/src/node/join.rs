use super::Node;
use crate::dht::PeerRecord;
use crate::error::Result;

impl Node {
    /// Join the ring `bootstrap` belongs to.
    ///
    /// Only a lonely node joins; joining yourself or joining twice is a no-op
    /// returning false. The bootstrap peer looks up the successor of this node's
    /// id, which becomes the provisional successor. The predecessor stays empty
    /// until the new predecessor notifies us during stabilization.
    ///
    /// If the bootstrap cannot be reached the node goes back to lonely and the
    /// error is returned, the caller may retry.
    pub async fn join(&self, bootstrap: PeerRecord) -> Result<bool> {
        if &bootstrap == self.peer() {
            tracing::debug!("[{}] ignored join with self", self.peer());
            return Ok(false);
        }
        if !self.ring.begin_join()? {
            tracing::debug!(
                "[{}] ignored join via {}, node is {}",
                self.peer(),
                bootstrap,
                self.ring.status()?
            );
            return Ok(false);
        }

        tracing::info!("[{}] joining via {}", self.peer(), bootstrap);
        let successor = match self.remote(&bootstrap).find_successor(self.did()).await {
            Ok(successor) => successor,
            Err(e) => {
                tracing::warn!("[{}] join via {} failed: {}", self.peer(), bootstrap, e);
                self.ring.abort_join()?;
                return Err(e);
            }
        };
        self.ring.complete_join(successor)?;
        self.add_well_known_peer(bootstrap);
        Ok(true)
    }
}
