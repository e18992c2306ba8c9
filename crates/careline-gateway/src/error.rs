//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use careline_core::CarelineError;

/// An HTTP-facing error: a status code and a human-readable detail string,
/// serialized as `{"detail": "..."}` the way clients already expect.
pub struct ApiError(pub StatusCode, pub String);

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, detail.into())
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, detail.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, detail.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            error!(status = %self.0, detail = %self.1, "Request failed");
        }
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

impl From<CarelineError> for ApiError {
    fn from(err: CarelineError) -> Self {
        ApiError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_maps_to_500() {
        let api: ApiError = CarelineError::Config("GROQ_API_KEY not configured".into()).into();
        assert_eq!(api.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.1.contains("GROQ_API_KEY"));
    }
}
