//! # Casefile HTTP API Module
//!
//! The Record Store and identity provider over axum.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check (public)
//! - `POST /api/auth/login` - Exchange admin credentials for a token (public)
//! - `GET /api/auth/verify` - Validate a token
//! - `GET|POST /api/{collection}` - List or create records
//! - `GET|PUT|DELETE /api/{collection}/{id}` - Read, update or delete one record
//! - `GET /api/board` - Relationship graph for a search key
//! - `GET /api/board/suggestions` - Key autocomplete
//! - `GET /api/dashboard` - Aggregates, optionally over a date range
//! - `POST /api/upload` - Multipart file upload
//! - `GET /uploads/*` - Uploaded files (public)
//!
//! ## Configuration
//!
//! - `FRONTEND_URL`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `CASEFILE_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `JWT_SECRET`: Token signing secret (required in production)

mod auth;
mod error;
mod handlers;
mod middleware;
mod types;
mod upload;

pub use auth::{ADMIN_ROLE, Claims, JwtKeys, TOKEN_TTL_SECS, credentials_match};
pub use error::ApiError;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    BoardQuery, CreatedResponse, DashboardQuery, ErrorResponse, HealthResponse, LoginRequest,
    LoginResponse, SuggestionQuery, UpdateRequest, UserInfo, VerifyResponse,
};
pub use upload::{UPLOADS_ROUTE, sanitize_filename};

use crate::config::ServerConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use casefile_core::{CasefileError, StorageBackend};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Request body cap; covers a full upload batch.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The record store behind every collection route.
    pub store: Arc<RwLock<StorageBackend>>,
    pub config: Arc<ServerConfig>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    #[must_use]
    pub fn new(store: StorageBackend, config: ServerConfig) -> Self {
        let jwt = JwtKeys::from_secret(config.jwt_secret.as_bytes());
        Self {
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `FRONTEND_URL`.
///
/// - `"*"`: any origin
/// - unset: localhost dev servers only
/// - otherwise: the comma-separated origins listed
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    match config.frontend_url.as_deref() {
        Some("*") => {
            if config.is_production() {
                tracing::warn!("CORS: Allowing ALL origins in production (FRONTEND_URL=*)");
            } else {
                tracing::warn!("CORS: Allowing ALL origins (FRONTEND_URL=*)");
            }
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!("CORS: No valid origins in FRONTEND_URL, defaulting to localhost");
                build_localhost_cors()
            } else {
                restricted_cors(allowed)
            }
        }
        None => {
            tracing::info!("CORS: No FRONTEND_URL set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();
    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Bearer authentication (protected routes only)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    let public = Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/api/auth/login", post(auth::login_handler));

    let protected = Router::new()
        .route("/api/auth/verify", get(auth::verify_handler))
        .route("/api/upload", post(upload::upload_handler))
        .route("/api/board", get(handlers::board_handler))
        .route("/api/board/suggestions", get(handlers::suggestions_handler))
        .route("/api/dashboard", get(handlers::dashboard_handler))
        .route(
            "/api/{collection}",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/api/{collection}/{id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let mut router = public
        .merge(protected)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&state.config.upload_dir));

    match create_rate_limiter(state.config.rate_limit) {
        Some(limiter) => {
            tracing::info!(
                "Rate limiting enabled: {} requests/second",
                state.config.rate_limit
            );
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), CasefileError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CasefileError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Casefile HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| CasefileError::IoError(format!("Server error: {}", e)))
}
