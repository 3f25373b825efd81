use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

/// A protocol error turned into an HTTP answer `{"error": message}`.
#[derive(Debug)]
pub struct HttpError(pub ringlet_core::Error);

impl From<ringlet_core::Error> for HttpError {
    fn from(e: ringlet_core::Error) -> Self {
        Self(e)
    }
}

impl HttpError {
    /// Status answered for the wrapped error.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("request failed: {}", self.0);
        } else {
            tracing::debug!("request refused: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
