//! # API Endpoint Handlers
//!
//! Record Store CRUD over every collection, plus the read-only board and
//! dashboard views computed from a store snapshot.

use super::{
    AppState,
    auth::Claims,
    error::ApiError,
    types::{
        BoardQuery, CreatedResponse, DashboardQuery, HealthResponse, SuggestionQuery,
        UpdateRequest,
    },
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use casefile_core::{
    BoardGraph, CasefileError, DashboardAggregates, DateRange, Record, RecordId, RecordKind,
    RecordStore, Stamp, build_graph, suggestions, system,
};
use chrono::Utc;
use serde_json::Value;

// =============================================================================
// HELPERS
// =============================================================================

fn collection_kind(collection: &str) -> Result<RecordKind, ApiError> {
    RecordKind::from_collection(collection)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown collection: {}", collection)))
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn stamp_for(claims: &Claims) -> Stamp {
    Stamp::new(Some(claims.name.clone()), now())
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.config.environment.clone(), now()))
}

// =============================================================================
// RECORD HANDLERS
// =============================================================================

/// `GET /api/{collection}`
pub async fn list_records(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let kind = collection_kind(&collection)?;
    let store = state.store.read().await;
    let records = store
        .list(kind)?
        .iter()
        .map(Record::to_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(records))
}

/// `GET /api/{collection}/{id}`
pub async fn get_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let kind = collection_kind(&collection)?;
    let store = state.store.read().await;
    let record = store
        .get(kind, RecordId(id))?
        .ok_or_else(|| ApiError::NotFound(format!("Record not found: {}/{}", collection, id)))?;
    Ok(Json(record.to_json()?))
}

/// `POST /api/{collection}`
pub async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = collection_kind(&collection)?;
    let Json(body) = payload?;
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "record body must be a JSON object".to_string(),
        ));
    }
    let record = Record::from_json(kind, body)?;

    let mut store = state.store.write().await;
    let stored = store.insert(record, &stamp_for(&claims))?;
    tracing::info!(collection = %kind, id = %stored.id(), "Record created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: stored.id() }),
    ))
}

/// `PUT /api/{collection}/{id}`
///
/// The body is a patch. A `"version"` field makes the update conditional.
pub async fn update_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let kind = collection_kind(&collection)?;
    let Json(body) = payload?;
    let request = UpdateRequest::from_body(body)?;

    let mut store = state.store.write().await;
    let updated = store
        .update(
            kind,
            RecordId(id),
            &request.patch,
            request.version,
            &stamp_for(&claims),
        )
        .inspect_err(|e| {
            if matches!(e, CasefileError::VersionConflict { .. }) {
                tracing::warn!(collection = %kind, id, "Update rejected: {}", e);
            }
        })?;
    Ok(Json(updated.to_json()?))
}

/// `DELETE /api/{collection}/{id}`
pub async fn delete_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    let kind = collection_kind(&collection)?;
    let mut store = state.store.write().await;
    if store.delete(kind, RecordId(id))? {
        tracing::info!(collection = %kind, id, "Record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Record not found: {}/{}",
            collection, id
        )))
    }
}

// =============================================================================
// BOARD HANDLERS
// =============================================================================

/// `GET /api/board?search=&anchoring=`
pub async fn board_handler(
    State(state): State<AppState>,
    query: Result<Query<BoardQuery>, QueryRejection>,
) -> Result<Json<BoardGraph>, ApiError> {
    let Query(query) = query?;
    let snapshot = state.store.read().await.snapshot()?;
    Ok(Json(build_graph(&query.search, &snapshot, query.anchoring)))
}

/// `GET /api/board/suggestions?q=`
pub async fn suggestions_handler(
    State(state): State<AppState>,
    query: Result<Query<SuggestionQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let Query(query) = query?;
    let snapshot = state.store.read().await.snapshot()?;
    Ok(Json(suggestions(&query.q, &snapshot)))
}

// =============================================================================
// DASHBOARD HANDLER
// =============================================================================

/// `GET /api/dashboard[?from=&to=]`
pub async fn dashboard_handler(
    State(state): State<AppState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Result<Json<DashboardAggregates>, ApiError> {
    let Query(query) = query?;
    let range = match (query.from.as_deref(), query.to.as_deref()) {
        (None, None) => None,
        (from, to) => Some(DateRange::new(
            from.unwrap_or_default(),
            to.unwrap_or_default(),
        )?),
    };

    let snapshot = state.store.read().await.snapshot()?;
    let aggregates = match range {
        Some(range) => system::compute_in_range(&snapshot, &range),
        None => system::compute(&snapshot),
    };
    Ok(Json(aggregates))
}
