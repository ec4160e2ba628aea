use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::KestrelError;

impl IntoResponse for KestrelError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            KestrelError::Config(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            KestrelError::Authentication(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            KestrelError::Permission(_) => (StatusCode::FORBIDDEN, self.to_string()),
            KestrelError::InvalidTarget(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            KestrelError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (status, Json(json!({"error": message}))).into_response()
    }
}
