//! Unit tests for API request/response types.

#![allow(clippy::unwrap_used, clippy::panic)]

use casefile::api::{BoardQuery, ErrorResponse, HealthResponse, UpdateRequest, sanitize_filename};
use casefile_core::{CasefileError, EdgeAnchoring};
use serde_json::json;

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

#[test]
fn test_error_response_shape() {
    let json = serde_json::to_value(ErrorResponse::new("Record not found")).unwrap();
    assert_eq!(json, json!({"success": false, "error": "Record not found"}));
}

#[test]
fn test_health_response_shape() {
    let health = HealthResponse::ok("production", "2024-05-01T00:00:00Z");
    let json = serde_json::to_value(&health).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["environment"], "production");
    assert_eq!(json["timestamp"], "2024-05-01T00:00:00Z");
}

// =============================================================================
// UPDATE BODIES
// =============================================================================

#[test]
fn test_update_request_splits_version() {
    let request = UpdateRequest::from_body(json!({"color": "red", "version": 4})).unwrap();
    assert_eq!(request.version, Some(4));
    assert_eq!(request.patch.get("color"), Some(&json!("red")));
    assert!(!request.patch.contains_key("version"));
}

#[test]
fn test_update_request_without_version() {
    let request = UpdateRequest::from_body(json!({"color": "red", "version": null})).unwrap();
    assert_eq!(request.version, None);
    assert_eq!(request.patch.len(), 1);
}

#[test]
fn test_update_request_rejects_bad_bodies() {
    for body in [json!([1, 2]), json!({"version": "two"}), json!({"version": -1})] {
        let err = UpdateRequest::from_body(body).unwrap_err();
        assert!(matches!(err, CasefileError::InvalidRecord(_)));
    }
}

// =============================================================================
// QUERIES
// =============================================================================

#[test]
fn test_board_query_defaults() {
    let query: BoardQuery = serde_json::from_value(json!({})).unwrap();
    assert_eq!(query.search, "");
    assert_eq!(query.anchoring, EdgeAnchoring::FirstPerson);

    let query: BoardQuery =
        serde_json::from_value(json!({"search": "1", "anchoring": "all_persons"})).unwrap();
    assert_eq!(query.anchoring, EdgeAnchoring::AllPersons);
}

#[test]
fn test_upload_names_are_sanitized() {
    assert_eq!(sanitize_filename("dir/evidence #2.png"), "evidence__2.png");
}
