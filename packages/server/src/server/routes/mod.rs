// HTTP routes
pub mod chat;
pub mod download;
pub mod health;
pub mod sessions;

pub use chat::*;
pub use download::*;
pub use health::*;
pub use sessions::*;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use crate::sessions::SessionError;
use extract::ExtractError;

/// JSON error body matching the error taxonomy: input errors, transport or
/// credential failures, and response-shape failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Wrapper that maps [`SessionError`] onto HTTP responses.
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, hint) = match &self.0 {
            SessionError::UnknownSession | SessionError::ArtifactNotFound => {
                (StatusCode::NOT_FOUND, "not_found", None)
            }
            SessionError::MissingUrl | SessionError::FieldIndex(_) => {
                (StatusCode::BAD_REQUEST, "input", None)
            }
            SessionError::Busy => (StatusCode::CONFLICT, "busy", None),
            SessionError::Extraction(e) => match e {
                ExtractError::MissingCredential
                | ExtractError::Transport(_)
                | ExtractError::Api { .. }
                | ExtractError::Failed { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "transport",
                    Some("Please check your API key and try again"),
                ),
                ExtractError::MissingData
                | ExtractError::UnexpectedShape { .. }
                | ExtractError::Json(_) => (StatusCode::BAD_GATEWAY, "response_shape", None),
            },
            SessionError::Format(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", None),
        };

        let body = ErrorBody {
            error: self.0.to_string(),
            kind,
            hint,
        };
        (status, Json(body)).into_response()
    }
}
