// =============================================================================
// API error type — maps loader failures onto HTTP responses
// =============================================================================
//
//   NoData          -> 404
//   InvalidSymbol   -> 400
//   bad query/body  -> 400
//   Schema          -> 502
//
// Body is always `{"error": "<message>"}`.
// =============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::market_data::LoadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Load(LoadError::NoData { .. }) => StatusCode::NOT_FOUND,
            Self::Load(LoadError::InvalidSymbol(_)) => StatusCode::BAD_REQUEST,
            Self::Load(LoadError::Schema { .. }) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, error = %self, "request failed");
        }
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
