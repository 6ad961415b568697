use crate::service::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

/// Application error types
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Body is not valid JSON for the entity type
    InvalidBody(String),
    /// Path id is not an integer
    InvalidId(String),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, field, error) = match self {
            ApiError::Service(e) => {
                let (status, kind, field) = match &e {
                    ServiceError::AlreadyExists { .. } => {
                        (StatusCode::BAD_REQUEST, "already_exists", None)
                    }
                    ServiceError::InvalidReference { field, .. } => {
                        (StatusCode::BAD_REQUEST, "invalid_reference", Some(*field))
                    }
                    ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", None),
                    ServiceError::Storage(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "storage", None)
                    }
                };
                (status, kind, field, e.to_string())
            }
            ApiError::InvalidBody(msg) => (StatusCode::BAD_REQUEST, "invalid_body", None, msg),
            ApiError::InvalidId(id) => (
                StatusCode::BAD_REQUEST,
                "invalid_id",
                None,
                format!("invalid id '{}': expected an integer", id),
            ),
        };

        let body = Json(ErrorResponse { error, kind, field });
        (status, body).into_response()
    }
}
