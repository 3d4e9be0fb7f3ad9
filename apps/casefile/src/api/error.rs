//! Mapping of failures to HTTP responses.

use super::types::ErrorResponse;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use casefile_core::CasefileError;

/// A handler failure with its HTTP status.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(&'static str),
    NotFound(String),
    Conflict(String),
    TooManyRequests,
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(m) | Self::NotFound(m) | Self::Conflict(m) | Self::Internal(m) => m,
            Self::Unauthorized(m) => m,
            Self::TooManyRequests => "Too Many Requests",
        }
    }
}

impl From<CasefileError> for ApiError {
    fn from(e: CasefileError) -> Self {
        match e {
            CasefileError::RecordNotFound(..) => Self::NotFound(e.to_string()),
            CasefileError::VersionConflict { .. } => Self::Conflict(e.to_string()),
            CasefileError::InvalidRecord(_)
            | CasefileError::InvalidNodeId(_)
            | CasefileError::SerializationError(_) => Self::BadRequest(e.to_string()),
            CasefileError::IoError(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self.message());
        }
        (status, Json(ErrorResponse::new(self.message()))).into_response()
    }
}
