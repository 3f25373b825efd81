//! Inbound dispatch, shared by every transport.
use serde_json::Value;

use super::decode;
use super::empty;
use super::IdRequest;
use super::StatusResponse;
use crate::dht::DepartNotice;
use crate::dht::MaybePeer;
use crate::dht::PeerRecord;
use crate::error::Result;
use crate::gateway::Operation;
use crate::node::Node;

impl Node {
    /// Serve one operation requested by a remote peer.
    pub async fn handle_request(&self, operation: &Operation, payload: Value) -> Result<Value> {
        tracing::trace!("[{}] serving {}", self.peer(), operation);
        let name = operation.name();
        let value = match operation {
            Operation::SelfPeer => serde_json::to_value(self.peer())?,
            Operation::Predecessor => serde_json::to_value(MaybePeer::from(self.predecessor()?))?,
            Operation::Successor => serde_json::to_value(MaybePeer::from(self.successor()?))?,
            Operation::Successors => serde_json::to_value(self.ring.successors()?)?,
            Operation::Status => serde_json::to_value(StatusResponse {
                status: self.status()?,
            })?,
            Operation::Metadata => Value::Object(self.metadata.clone()),
            Operation::Notify => {
                let candidate: PeerRecord = decode(&name, payload)?;
                self.ring.notify(candidate)?;
                empty()
            }
            Operation::FindSuccessor => {
                let req: IdRequest = decode(&name, payload)?;
                serde_json::to_value(self.find_successor(req.id).await?)?
            }
            Operation::ClosestPrecedingFinger => {
                let req: IdRequest = decode(&name, payload)?;
                serde_json::to_value(self.closest_preceding_finger(req.id)?)?
            }
            Operation::Depart => {
                let notice: DepartNotice = decode(&name, payload)?;
                self.ring.depart(notice)?;
                empty()
            }
            Operation::Inspect => serde_json::to_value(self.inspect()?)?,
            Operation::Handle(action) => self.handlers.dispatch(action, payload).await?,
        };
        Ok(value)
    }
}
