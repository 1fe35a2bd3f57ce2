//! HTTP mapping for service errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use parley_core::ParleyError;

/// A service error on its way out as JSON.
#[derive(Debug)]
pub struct ApiError(pub ParleyError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ParleyError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ParleyError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = %status, kind = self.0.kind(), error = %self.0, "Request failed");
        let body = Json(json!({
            "error": self.0.kind(),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
