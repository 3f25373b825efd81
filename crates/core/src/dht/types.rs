use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::dht::PeerRecord;
use crate::error::Error;

/// Lifecycle of a ring position.
///
/// A node starts `Lonely`, passes through `Joining` while it asks a bootstrap peer
/// for its successor, and is `Joined` as soon as it has any neighbor. Graceful
/// shutdown moves it to `Leaving` and finally `Stopped`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Lonely,
    Joining,
    Joined,
    Leaving,
    Stopped,
}

impl PeerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerStatus::Lonely => "lonely",
            PeerStatus::Joining => "joining",
            PeerStatus::Joined => "joined",
            PeerStatus::Leaving => "leaving",
            PeerStatus::Stopped => "stopped",
        }
    }

    /// The node still takes part in ring maintenance.
    pub fn is_active(&self) -> bool {
        !matches!(self, PeerStatus::Leaving | PeerStatus::Stopped)
    }
}

impl std::fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PeerStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lonely" => Ok(PeerStatus::Lonely),
            "joining" => Ok(PeerStatus::Joining),
            "joined" => Ok(PeerStatus::Joined),
            "leaving" => Ok(PeerStatus::Leaving),
            "stopped" => Ok(PeerStatus::Stopped),
            other => Err(Error::InvalidPayload(
                "status".to_string(),
                format!("unknown status {other}"),
            )),
        }
    }
}

/// Change of the local ring view, published to [crate::node::Node::subscribe] receivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RingEvent {
    SuccessorChanged(Option<PeerRecord>),
    PredecessorChanged(Option<PeerRecord>),
    StatusChanged { from: PeerStatus, to: PeerStatus },
}

/// Consistent copy of the local ring view, taken under one read lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingSnapshot {
    pub peer: PeerRecord,
    pub status: PeerStatus,
    pub predecessor: Option<PeerRecord>,
    pub successor: Option<PeerRecord>,
    pub successors: Vec<PeerRecord>,
}

/// Sent by a leaving node to its neighbors so they can splice it out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartNotice {
    pub peer: PeerRecord,
    pub predecessor: Option<PeerRecord>,
    pub successor: Option<PeerRecord>,
}
