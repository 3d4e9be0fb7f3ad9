//! # Property-Based Tests
//!
//! Invariants of key normalization, board construction and zoom.

use casefile_core::board::{BoardSurface, Zoom};
use casefile_core::primitives::{
    MAX_SUGGESTIONS, MAX_ZOOM, MIN_CANVAS_HEIGHT, MIN_CANVAS_WIDTH, MIN_ZOOM,
};
use casefile_core::{
    EdgeAnchoring, Record, RecordKind, Snapshot, build_graph, normalize_key, suggestions,
};
use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

// =============================================================================
// HELPERS
// =============================================================================

fn snapshot_from(persons: &[String], vehicles: &[String]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (i, key) in persons.iter().enumerate() {
        let record = Record::from_json(
            RecordKind::Person,
            json!({"id": i + 1, "key": key, "displayName": format!("P{i}")}),
        )
        .expect("person");
        snapshot.push(record);
    }
    for (i, key) in vehicles.iter().enumerate() {
        let record = Record::from_json(
            RecordKind::Vehicle,
            json!({"id": i + 1, "plate": format!("V{i}"), "primaryLinkKey": key}),
        )
        .expect("vehicle");
        snapshot.push(record);
    }
    snapshot
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[0-9]{3}\\.?[0-9]{3}\\.?[0-9]{3}-?[0-9]{2}"
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Normalization keeps exactly the digits, in order, and is idempotent.
    #[test]
    fn normalization_keeps_digits_only(raw in ".{0,40}") {
        let normalized = normalize_key(&raw);
        prop_assert!(normalized.chars().all(|c| c.is_ascii_digit()));
        prop_assert_eq!(normalize_key(&normalized), normalized.clone());
        let expected: String = raw.chars().filter(char::is_ascii_digit).collect();
        prop_assert_eq!(normalized, expected);
    }

    /// Punctuation in a search never changes the board.
    #[test]
    fn formatted_and_bare_search_agree(
        persons in vec(key_strategy(), 0..6),
        vehicles in vec(key_strategy(), 0..10),
        pick in 0usize..6,
    ) {
        let snapshot = snapshot_from(&persons, &vehicles);
        let search = persons.get(pick).cloned().unwrap_or_else(|| "123".to_string());
        let formatted = build_graph(&search, &snapshot, EdgeAnchoring::FirstPerson);
        let bare = build_graph(&normalize_key(&search), &snapshot, EdgeAnchoring::FirstPerson);
        prop_assert_eq!(formatted, bare);
    }

    /// Same snapshot and search always produce the same board.
    #[test]
    fn layout_is_deterministic(
        persons in vec(key_strategy(), 0..6),
        vehicles in vec(key_strategy(), 0..10),
        search in "[0-9]{1,4}",
    ) {
        let snapshot = snapshot_from(&persons, &vehicles);
        let a = build_graph(&search, &snapshot, EdgeAnchoring::AllPersons);
        let b = build_graph(&search, &snapshot, EdgeAnchoring::AllPersons);
        prop_assert_eq!(a, b);
    }

    /// Edges only ever join a person node to a non-person node, and both
    /// endpoints exist on the board.
    #[test]
    fn edges_join_persons_to_records(
        persons in vec(key_strategy(), 0..6),
        vehicles in vec(key_strategy(), 0..10),
        search in "[0-9]{1,3}",
    ) {
        let snapshot = snapshot_from(&persons, &vehicles);
        let graph = build_graph(&search, &snapshot, EdgeAnchoring::AllPersons);
        for edge in &graph.edges {
            let from = graph.node(&edge.from).expect("from node");
            let to = graph.node(&edge.to).expect("to node");
            prop_assert_eq!(from.kind, RecordKind::Person);
            prop_assert_ne!(to.kind, RecordKind::Person);
        }
    }

    /// The canvas never shrinks below its minimum.
    #[test]
    fn canvas_respects_minimum(
        persons in vec(key_strategy(), 0..6),
        vehicles in vec(key_strategy(), 0..20),
        search in "[0-9]{0,3}",
    ) {
        let snapshot = snapshot_from(&persons, &vehicles);
        let graph = build_graph(&search, &snapshot, EdgeAnchoring::FirstPerson);
        prop_assert!(graph.canvas.width >= MIN_CANVAS_WIDTH);
        prop_assert!(graph.canvas.height >= MIN_CANVAS_HEIGHT);
    }

    /// Suggestions are distinct, bounded and all contain the typed digits.
    #[test]
    fn suggestions_are_bounded_and_distinct(
        persons in vec(key_strategy(), 0..15),
        vehicles in vec(key_strategy(), 0..15),
        typed in "[0-9]{1,2}",
    ) {
        let snapshot = snapshot_from(&persons, &vehicles);
        let list = suggestions(&typed, &snapshot);
        prop_assert!(list.len() <= MAX_SUGGESTIONS);
        let distinct: BTreeSet<&String> = list.iter().collect();
        prop_assert_eq!(distinct.len(), list.len());
        for key in &list {
            prop_assert!(normalize_key(key).contains(&typed));
        }
    }

    /// No sequence of zoom actions leaves the clamp range.
    #[test]
    fn zoom_stays_bounded(actions in vec(0u8..3, 0..60)) {
        let mut zoom = Zoom::default();
        for action in actions {
            match action {
                0 => zoom.zoom_in(),
                1 => zoom.zoom_out(),
                _ => zoom.reset(),
            }
            prop_assert!(zoom.factor() >= MIN_ZOOM);
            prop_assert!(zoom.factor() <= MAX_ZOOM);
        }
    }

    /// Clearing the search twice is the same as clearing it once.
    #[test]
    fn clearing_is_idempotent(
        persons in vec(key_strategy(), 1..4),
        vehicles in vec(key_strategy(), 0..6),
    ) {
        let snapshot = snapshot_from(&persons, &vehicles);
        let mut surface = BoardSurface::new(EdgeAnchoring::FirstPerson);
        surface.type_search(&persons[0], &snapshot);
        surface.submit_search(&snapshot);
        surface.clear_search();
        let once = surface.graph().clone();
        surface.clear_search();
        prop_assert_eq!(surface.graph(), &once);
        prop_assert!(surface.graph().is_empty());
        prop_assert_eq!(surface.graph().canvas.width, MIN_CANVAS_WIDTH);
    }
}
