//! HTTP server side of the ring protocol.
//!
//! Every [Operation] is `POST /{operation}` with a JSON body, actions live under
//! `POST /handle/{action}`. An empty body stands for `{}`.
#![warn(missing_docs)]
mod http_error;

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use ringlet_core::gateway::Operation;
use ringlet_core::message::empty;
use ringlet_core::node::Node;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

pub use self::http_error::HttpError;
use crate::error::Error;
use crate::error::Result;

/// Header carrying [crate::util::build_version] on every response.
pub const VERSION_HEADER: &str = "x-ringlet-version";

/// Routes serving `node` to its peers.
pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/handle/:action", post(action_handler))
        .route("/:operation", post(operation_handler))
        .with_state(node)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(node_info_header))
}

/// Serve `node` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: std::net::TcpListener,
    node: Arc<Node>,
    shutdown: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("[{}] ring endpoint: http://{}", node.peer(), addr);
    }
    axum::Server::from_tcp(listener)
        .map_err(|e| Error::ServeFailed(e.to_string()))?
        .serve(router(node).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::ServeFailed(e.to_string()))
}

async fn operation_handler(
    State(node): State<Arc<Node>>,
    Path(operation): Path<String>,
    body: Bytes,
) -> std::result::Result<Json<Value>, HttpError> {
    let operation = Operation::from_str(&operation)?;
    dispatch(&node, operation, &body).await
}

async fn action_handler(
    State(node): State<Arc<Node>>,
    Path(action): Path<String>,
    body: Bytes,
) -> std::result::Result<Json<Value>, HttpError> {
    dispatch(&node, Operation::Handle(action), &body).await
}

async fn dispatch(
    node: &Node,
    operation: Operation,
    body: &[u8],
) -> std::result::Result<Json<Value>, HttpError> {
    let payload = parse_body(&operation, body)?;
    Ok(Json(node.handle_request(&operation, payload).await?))
}

fn parse_body(operation: &Operation, body: &[u8]) -> ringlet_core::Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(empty());
    }
    serde_json::from_slice(body)
        .map_err(|e| ringlet_core::Error::InvalidPayload(operation.name(), e.to_string()))
}

async fn node_info_header<B>(
    req: http::Request<B>,
    next: axum::middleware::Next<B>,
) -> axum::response::Response {
    let mut res = next.run(req).await;
    if let Ok(version) = http::HeaderValue::from_str(crate::util::build_version().as_str()) {
        res.headers_mut().insert(VERSION_HEADER, version);
    }
    res
}
