//! Peer record, the addressable description of a ring member.

use std::hash::Hash;
use std::hash::Hasher;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::dht::Did;

/// A ring member reachable at `host:port`.
///
/// The id is always derived from the address. Equality and hashing only look at
/// the address, and deserialization recomputes the id, so a remote peer cannot
/// hand out a record whose id disagrees with its address.
#[derive(Clone, Debug, Serialize)]
pub struct PeerRecord {
    id: Did,
    host: String,
    port: u16,
}

#[derive(Deserialize)]
struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerRecord {
    /// Create a record and derive its id.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            id: Did::from_address(&host, port),
            host,
            port,
        }
    }

    pub fn id(&self) -> Did {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for PeerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl PartialEq for PeerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for PeerRecord {}

impl Hash for PeerRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl<'de> Deserialize<'de> for PeerRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let addr = PeerAddress::deserialize(deserializer)?;
        Ok(PeerRecord::new(addr.host, addr.port))
    }
}

/// An optional peer on the wire: a record, or `{}` when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaybePeer {
    Peer(PeerRecord),
    Empty {},
}

impl From<Option<PeerRecord>> for MaybePeer {
    fn from(peer: Option<PeerRecord>) -> Self {
        match peer {
            Some(p) => MaybePeer::Peer(p),
            None => MaybePeer::Empty {},
        }
    }
}

impl From<MaybePeer> for Option<PeerRecord> {
    fn from(peer: MaybePeer) -> Self {
        match peer {
            MaybePeer::Peer(p) => Some(p),
            MaybePeer::Empty {} => None,
        }
    }
}
