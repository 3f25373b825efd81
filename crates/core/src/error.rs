//! Error of ringlet_core

use crate::dht::Did;
use crate::dht::PeerStatus;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in ringlet-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Peer {peer} is unreachable on {operation}: {reason}")]
    Unreachable {
        peer: String,
        operation: String,
        reason: String,
    },

    #[error("Peer {peer} rejected {operation} with status {status}: {message}")]
    Rejected {
        peer: String,
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Action {0} is not registered")]
    ActionNotFound(String),

    #[error("Action {0} failed: {1}")]
    ActionFailed(String, String),

    #[error("Invalid payload for {0}: {1}")]
    InvalidPayload(String, String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Lookup of {0} exhausted after {1} hops")]
    LookupExhausted(Did, usize),

    #[error("Lookup of {0} timed out")]
    LookupTimeout(Did),

    #[error("Cannot {0} while node is {1}")]
    InvalidStatus(&'static str, PeerStatus),

    #[error("Failed on acquire ring state lock")]
    RingStateLock,

    #[error("Invalid hexadecimal did")]
    BadDid,

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// The failure is the caller's signal to drop the neighbor it was talking to.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::Unreachable { .. })
    }

    /// Status a transport should answer with when this error ends an inbound request.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ActionNotFound(_) | Error::UnknownOperation(_) => 404,
            Error::InvalidPayload(..) | Error::BadDid => 400,
            _ => 500,
        }
    }
}
