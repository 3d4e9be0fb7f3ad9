//! # Authentication Module
//!
//! The identity provider: one admin principal, signed bearer tokens.
//!
//! - `POST /api/auth/login` exchanges the admin credentials for a token
//! - `GET /api/auth/verify` echoes the principal behind a valid token
//! - every other `/api` route except `/api/health` goes through
//!   [`require_bearer`]
//!
//! ## Usage
//!
//! ```text
//! Authorization: Bearer <token>
//! ```

use super::{
    AppState,
    error::ApiError,
    types::{LoginRequest, LoginResponse, UserInfo, VerifyResponse},
};
use crate::config::AdminAccount;
use axum::{
    Extension, Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Token lifetime.
pub const TOKEN_TTL_SECS: i64 = 8 * 60 * 60;

/// Role carried by the admin principal.
pub const ADMIN_ROLE: &str = "admin";

// =============================================================================
// TOKENS
// =============================================================================

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal email.
    pub sub: String,
    pub name: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    #[must_use]
    pub fn user(&self) -> UserInfo {
        UserInfo {
            email: self.sub.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
        }
    }
}

/// HS256 signing and verification keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a token for `admin`, valid for [`TOKEN_TTL_SECS`] from `now`.
    pub fn issue(&self, admin: &AdminAccount, now: i64) -> Result<String, ApiError> {
        let claims = Claims {
            sub: admin.email.clone(),
            name: admin.name.clone(),
            role: ADMIN_ROLE.to_string(),
            iat: now.max(0) as u64,
            exp: now.saturating_add(TOKEN_TTL_SECS).max(0) as u64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
    }
}

// =============================================================================
// CREDENTIAL CHECK
// =============================================================================

/// Constant-time byte comparison.
///
/// Both sides are padded to the same length so `ct_eq` always runs over the
/// same number of bytes.
fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// Whether the credentials name the admin. Email is case-insensitive.
#[must_use]
pub fn credentials_match(admin: &AdminAccount, email: &str, password: &str) -> bool {
    let email_ok = constant_time_eq(
        email.trim().to_lowercase().as_bytes(),
        admin.email.trim().to_lowercase().as_bytes(),
    );
    let password_ok = constant_time_eq(password.as_bytes(), admin.password.as_bytes());
    email_ok & password_ok
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/login`
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let admin = &state.config.admin;

    if !credentials_match(admin, &request.email, &request.password) {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_credentials",
            "Login failed"
        );
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let token = state.jwt.issue(admin, Utc::now().timestamp())?;
    tracing::info!(event = "login", user = %admin.email, "Login succeeded");
    Ok(Json(LoginResponse {
        token,
        user: UserInfo {
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: ADMIN_ROLE.to_string(),
        },
    }))
}

/// `GET /api/auth/verify`
pub async fn verify_handler(Extension(claims): Extension<Claims>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: claims.user(),
    })
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Bearer token middleware.
///
/// Accepts `Authorization: Bearer <token>` (or the raw token) and stores the
/// verified [`Claims`] as a request extension.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header_value) = auth_header else {
        tracing::warn!(
            event = "auth_failure",
            reason = "missing_authorization_header",
            "Missing Authorization header"
        );
        return Err(ApiError::Unauthorized("Unauthorized"));
    };

    let token = header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
        .trim();

    match state.jwt.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_token",
                error = %e,
                "Authentication failed: invalid token"
            );
            Err(ApiError::Unauthorized("Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
