//! Typed calls against one remote peer.
use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::Value;

use super::FailureDetector;
use super::Operation;
use crate::dht::DepartNotice;
use crate::dht::Did;
use crate::dht::MaybePeer;
use crate::dht::PeerRecord;
use crate::dht::PeerStatus;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::RingInspect;
use crate::message::IdRequest;
use crate::message::Metadata;
use crate::message::StatusResponse;

/// A peer seen through the [FailureDetector].
/// Answers that cannot be decoded are protocol violations.
pub struct RemotePeer<'a> {
    detector: &'a FailureDetector,
    target: &'a PeerRecord,
}

impl<'a> RemotePeer<'a> {
    pub fn new(detector: &'a FailureDetector, target: &'a PeerRecord) -> Self {
        Self { detector, target }
    }

    pub fn target(&self) -> &PeerRecord {
        self.target
    }

    async fn request<T: DeserializeOwned>(&self, operation: Operation, payload: Value) -> Result<T> {
        let value = self.detector.call(self.target, &operation, payload).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::ProtocolViolation(format!(
                "{} answered {} with malformed data: {}",
                self.target, operation, e
            ))
        })
    }

    pub async fn self_record(&self) -> Result<PeerRecord> {
        self.request(Operation::SelfPeer, json!({})).await
    }

    pub async fn predecessor(&self) -> Result<Option<PeerRecord>> {
        let peer: MaybePeer = self.request(Operation::Predecessor, json!({})).await?;
        Ok(peer.into())
    }

    pub async fn successor(&self) -> Result<Option<PeerRecord>> {
        let peer: MaybePeer = self.request(Operation::Successor, json!({})).await?;
        Ok(peer.into())
    }

    pub async fn successors(&self) -> Result<Vec<PeerRecord>> {
        self.request(Operation::Successors, json!({})).await
    }

    pub async fn status(&self) -> Result<PeerStatus> {
        let resp: StatusResponse = self.request(Operation::Status, json!({})).await?;
        Ok(resp.status)
    }

    pub async fn metadata(&self) -> Result<Metadata> {
        self.request(Operation::Metadata, json!({})).await
    }

    /// Tell the peer that `candidate` may be its predecessor.
    pub async fn notify(&self, candidate: &PeerRecord) -> Result<()> {
        let _: Value = self
            .request(Operation::Notify, serde_json::to_value(candidate)?)
            .await?;
        Ok(())
    }

    pub async fn find_successor(&self, id: Did) -> Result<PeerRecord> {
        self.request(
            Operation::FindSuccessor,
            serde_json::to_value(IdRequest { id })?,
        )
        .await
    }

    pub async fn closest_preceding_finger(&self, id: Did) -> Result<PeerRecord> {
        self.request(
            Operation::ClosestPrecedingFinger,
            serde_json::to_value(IdRequest { id })?,
        )
        .await
    }

    pub async fn depart(&self, notice: &DepartNotice) -> Result<()> {
        let _: Value = self
            .request(Operation::Depart, serde_json::to_value(notice)?)
            .await?;
        Ok(())
    }

    pub async fn inspect(&self) -> Result<RingInspect> {
        self.request(Operation::Inspect, json!({})).await
    }

    pub async fn handle(&self, action: &str, payload: Value) -> Result<Value> {
        self.request(Operation::Handle(action.to_string()), payload)
            .await
    }
}
