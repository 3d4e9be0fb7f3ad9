//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API. Record bodies
//! themselves are the untagged collection JSON produced by
//! `Record::to_json`.

use casefile_core::{CasefileError, EdgeAnchoring, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub environment: String,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn ok(environment: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            status: "OK".to_string(),
            message: format!("Casefile API v{} running", env!("CARGO_PKG_VERSION")),
            environment: environment.into(),
            timestamp: timestamp.into(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

// =============================================================================
// RECORD WRITES
// =============================================================================

/// Response to a record create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: RecordId,
}

/// An update body: the patch fields plus an optional base version.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub patch: Map<String, Value>,
    pub version: Option<u64>,
}

impl UpdateRequest {
    /// Split `"version"` out of a JSON object body.
    pub fn from_body(body: Value) -> Result<Self, CasefileError> {
        let Value::Object(mut patch) = body else {
            return Err(CasefileError::InvalidRecord(
                "update body must be a JSON object".to_string(),
            ));
        };
        let version = match patch.remove("version") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.as_u64().ok_or_else(|| {
                CasefileError::InvalidRecord(format!("invalid version: {n}"))
            })?),
            Some(other) => {
                return Err(CasefileError::InvalidRecord(format!(
                    "invalid version: {other}"
                )));
            }
        };
        Ok(Self { patch, version })
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The authenticated principal as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Token verification result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserInfo,
}

// =============================================================================
// BOARD / DASHBOARD QUERIES
// =============================================================================

/// `GET /api/board` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub anchoring: EdgeAnchoring,
}

/// `GET /api/board/suggestions` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// `GET /api/dashboard` query string. Both dates or neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}
