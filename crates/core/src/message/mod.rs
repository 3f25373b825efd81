//! Messages exchanged between nodes and their inbound dispatch.
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::dht::Did;
use crate::dht::PeerStatus;
use crate::error::Error;
use crate::error::Result;

pub mod action;
mod handlers;

pub use action::action_fn;
pub use action::ActionError;
pub use action::ActionHandler;
pub use action::HandlerRegistry;

/// Opaque application metadata attached to a node.
pub type Metadata = serde_json::Map<String, Value>;

/// Answer of `status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: PeerStatus,
}

/// Payload of `find-successor` and `closest-preceding-finger`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRequest {
    pub id: Did,
}

/// Empty JSON object, the answer of operations with nothing to say.
pub fn empty() -> Value {
    Value::Object(Default::default())
}

/// Decode an inbound payload. `null` counts as `{}`.
pub fn decode<T: serde::de::DeserializeOwned>(operation: &str, payload: Value) -> Result<T> {
    let payload = if payload.is_null() { empty() } else { payload };
    serde_json::from_value(payload)
        .map_err(|e| Error::InvalidPayload(operation.to_string(), e.to_string()))
}
