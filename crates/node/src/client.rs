//! HTTP client side of the ring protocol.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use ringlet_core::dht::PeerRecord;
use ringlet_core::gateway::CallFailure;
use ringlet_core::gateway::Operation;
use ringlet_core::gateway::RemoteGateway;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

/// [RemoteGateway] that posts every operation to `http://{host}:{port}/{operation}`.
pub struct HttpGateway {
    client: HttpClient,
}

impl HttpGateway {
    /// `timeout` bounds connect plus response of one call.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::HttpClientError(e.to_string()))?;
        Ok(Self { client })
    }

    fn url(target: &PeerRecord, operation: &Operation) -> String {
        format!("http://{}/{}", target.address(), operation.name())
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn call(
        &self,
        target: &PeerRecord,
        operation: &Operation,
        payload: Value,
    ) -> std::result::Result<Value, CallFailure> {
        let resp = self
            .client
            .post(Self::url(target, operation))
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| CallFailure::Unreachable(e.to_string()))?;

        let status = resp.status();
        // A body cut off mid-way means the connection was lost.
        let body = resp
            .bytes()
            .await
            .map_err(|e| CallFailure::Unreachable(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(CallFailure::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        decode_body(&body).map_err(|e| CallFailure::Rejected {
            status: status.as_u16(),
            message: format!("response of {operation} is not JSON: {e}"),
        })
    }
}

fn decode_body(body: &[u8]) -> serde_json::Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body)
}

/// Pull `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).to_string())
}
