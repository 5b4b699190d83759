use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, warn};

use crate::users::services::DirectoryError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: u16,
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Unexpected server error.".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            timestamp: OffsetDateTime::now_utc(),
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(_) => {
                warn!(error = %e, "user not found");
                Self {
                    status: StatusCode::NOT_FOUND,
                    message: e.to_string(),
                }
            }
            DirectoryError::Conflict => {
                warn!(error = %e, "duplicate field");
                Self {
                    status: StatusCode::CONFLICT,
                    message: e.to_string(),
                }
            }
            DirectoryError::Store(inner) => {
                error!(error = ?inner, "unexpected store failure");
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        warn!(error = %r, "bad json");
        Self::bad_request(format!("Malformed JSON request: {}", r.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        warn!(error = %r, "bad query");
        Self::bad_request(r.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        warn!(error = %r, "bad path parameter");
        Self::bad_request(r.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn directory_errors_map_to_status_codes() {
        let not_found: ApiError = DirectoryError::NotFound(Uuid::nil()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert!(not_found.message.contains("00000000-0000-0000-0000-000000000000"));

        let conflict: ApiError = DirectoryError::Conflict.into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.message, "Email or phone number already in use.");

        let store: ApiError = DirectoryError::Store(anyhow::anyhow!("connection reset")).into();
        assert_eq!(store.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.message, "Unexpected server error.");
    }

    #[test]
    fn error_body_serializes() {
        let body = ErrorResponse {
            timestamp: time::macros::datetime!(2025-03-01 12:00 UTC),
            status: 409,
            error: "Conflict".into(),
            message: "Email or phone number already in use.".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["timestamp"], "2025-03-01T12:00:00Z");
        assert_eq!(json["status"], 409);
        assert_eq!(json["error"], "Conflict");
    }
}
