//! Failure detection around remote calls.
use std::time::Duration;

use serde_json::Value;

use super::CallFailure;
use super::Operation;
use super::SharedGateway;
use crate::dht::PeerRecord;
use crate::error::Error;
use crate::error::Result;

/// Wraps every outbound call with a timeout and one retry on `Unreachable`.
///
/// The detector only reports. An [Error::Unreachable] coming out of it means the
/// peer stayed unreachable after the retry, and the caller owning the neighbor
/// pointer decides what to repair.
#[derive(Clone)]
pub struct FailureDetector {
    gateway: SharedGateway,
    call_timeout: Duration,
}

impl FailureDetector {
    pub fn new(gateway: SharedGateway, call_timeout: Duration) -> Self {
        Self {
            gateway,
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub async fn call(
        &self,
        target: &PeerRecord,
        operation: &Operation,
        payload: Value,
    ) -> Result<Value> {
        let failure = match self.attempt(target, operation, payload.clone()).await {
            Ok(v) => return Ok(v),
            Err(CallFailure::Unreachable(reason)) => {
                tracing::debug!(
                    "[detector] {} unreachable on {}, retrying: {}",
                    target,
                    operation,
                    reason
                );
                match self.attempt(target, operation, payload).await {
                    Ok(v) => return Ok(v),
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        Err(match failure {
            CallFailure::Unreachable(reason) => {
                tracing::warn!("[detector] {} reported dead on {}: {}", target, operation, reason);
                Error::Unreachable {
                    peer: target.address(),
                    operation: operation.name(),
                    reason,
                }
            }
            CallFailure::Rejected { status, message } => Error::Rejected {
                peer: target.address(),
                operation: operation.name(),
                status,
                message,
            },
        })
    }

    async fn attempt(
        &self,
        target: &PeerRecord,
        operation: &Operation,
        payload: Value,
    ) -> std::result::Result<Value, CallFailure> {
        tokio::time::timeout(
            self.call_timeout,
            self.gateway.call(target, operation, payload),
        )
        .await
        .unwrap_or_else(|_| {
            Err(CallFailure::Unreachable(format!(
                "timed out after {:?}",
                self.call_timeout
            )))
        })
    }
}
