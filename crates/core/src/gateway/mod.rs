//! Remote call gateway.
//!
//! Every interaction with another node is an [Operation] with a JSON payload sent
//! through a [RemoteGateway]. The protocol code never knows which transport carries
//! it: `ringlet-node` plugs in HTTP, tests plug in [LocalNetwork].
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dht::PeerRecord;
use crate::error::Error;

pub mod detector;
pub mod local;
pub mod remote;

pub use detector::FailureDetector;
pub use local::LocalNetwork;
pub use remote::RemotePeer;

/// Operations a node serves to its peers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    SelfPeer,
    Predecessor,
    Successor,
    Successors,
    Status,
    Metadata,
    Notify,
    FindSuccessor,
    ClosestPrecedingFinger,
    Depart,
    Inspect,
    Handle(String),
}

impl Operation {
    /// Operations without a variable part, as served by transports.
    pub const FIXED: [Operation; 11] = [
        Operation::SelfPeer,
        Operation::Predecessor,
        Operation::Successor,
        Operation::Successors,
        Operation::Status,
        Operation::Metadata,
        Operation::Notify,
        Operation::FindSuccessor,
        Operation::ClosestPrecedingFinger,
        Operation::Depart,
        Operation::Inspect,
    ];

    /// Wire name, also the HTTP path.
    pub fn name(&self) -> String {
        match self {
            Operation::SelfPeer => "self".to_string(),
            Operation::Predecessor => "predecessor".to_string(),
            Operation::Successor => "successor".to_string(),
            Operation::Successors => "successors".to_string(),
            Operation::Status => "status".to_string(),
            Operation::Metadata => "metadata".to_string(),
            Operation::Notify => "notify".to_string(),
            Operation::FindSuccessor => "find-successor".to_string(),
            Operation::ClosestPrecedingFinger => "closest-preceding-finger".to_string(),
            Operation::Depart => "depart".to_string(),
            Operation::Inspect => "inspect".to_string(),
            Operation::Handle(action) => format!("handle/{action}"),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(action) = s.strip_prefix("handle/") {
            if action.is_empty() {
                return Err(Error::UnknownOperation(s.to_string()));
            }
            return Ok(Operation::Handle(action.to_string()));
        }
        Operation::FIXED
            .iter()
            .find(|op| op.name() == s)
            .cloned()
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

/// Why a remote call produced no result.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CallFailure {
    /// Connection refused, lost or timed out.
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// The peer answered with an application error.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl From<Error> for CallFailure {
    fn from(e: Error) -> Self {
        CallFailure::Rejected {
            status: e.status_code(),
            message: e.to_string(),
        }
    }
}

/// Sends one operation to one peer.
/// Implementations should bound every call, but [FailureDetector] adds its own
/// timeout on top so a misbehaving gateway cannot stall the protocol.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn call(
        &self,
        target: &PeerRecord,
        operation: &Operation,
        payload: Value,
    ) -> Result<Value, CallFailure>;
}

pub type SharedGateway = Arc<dyn RemoteGateway>;
