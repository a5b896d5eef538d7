//! HTTP mapping for pipeline failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fable_core::PipelineError;
use serde_json::json;

/// Wrapper so pipeline errors can be returned straight from handlers.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidImage { .. } => StatusCode::BAD_REQUEST,
            PipelineError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::CredentialMissing { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::RemoteServiceError { .. } => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "Request failed: {}", self.0);
        } else {
            tracing::warn!(kind = self.0.kind(), "Request rejected: {}", self.0);
        }

        let body = Json(json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
