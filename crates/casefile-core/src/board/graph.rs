//! # Relationship Graph Builder
//!
//! Turns a search key and a [`Snapshot`] into positioned board nodes and the
//! edges between them.
//!
//! ## Matching
//!
//! Keys are compared after [`normalize_key`], which keeps digits only, so
//! `"123.456.789-00"` and `"12345678900"` are the same key. A record is on
//! the board when its normalized key *contains* the normalized search.
//!
//! ## Layout
//!
//! Person nodes sit on the anchor. Linked records are spread evenly on a ring
//! around it, in collection order, regardless of kind. No randomness: the same
//! input always yields the same coordinates.

use crate::primitives::{
    ANCHOR_X, ANCHOR_Y, CANVAS_PADDING, MAX_SUGGESTIONS, MIN_CANVAS_HEIGHT, MIN_CANVAS_WIDTH,
    RING_RADIUS,
};
use crate::{CasefileError, Record, RecordId, RecordKind, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::TAU;

// =============================================================================
// KEY NORMALIZATION
// =============================================================================

/// Strip everything but ASCII digits.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Whether `candidate` contains an already-normalized `needle`.
///
/// An empty needle matches nothing.
fn key_contains(candidate: &str, needle: &str) -> bool {
    !needle.is_empty() && normalize_key(candidate).contains(needle)
}

// =============================================================================
// NODE IDENTIFIERS
// =============================================================================

/// Synthetic board node identifier: `<collection>-<record id>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(kind: RecordKind, id: RecordId) -> Self {
        Self(format!("{}-{}", kind.collection(), id.0))
    }

    /// Recover the record kind and id a node was built from.
    pub fn parse(&self) -> Result<(RecordKind, RecordId), CasefileError> {
        let invalid = || CasefileError::InvalidNodeId(self.0.clone());
        let (collection, id) = self.0.rsplit_once('-').ok_or_else(invalid)?;
        let kind = RecordKind::from_collection(collection).ok_or_else(invalid)?;
        let id = id.parse::<u64>().map_err(|_| invalid())?;
        Ok((kind, RecordId(id)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// NODES, EDGES, CANVAS
// =============================================================================

/// A positioned board node. Transient: rebuilt on every search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub title: String,
    pub subtitle: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub primary_link_key: Option<String>,
}

impl GraphNode {
    fn from_record(record: &Record, x: f64, y: f64) -> Self {
        let kind = record.kind();
        Self {
            id: NodeId::new(kind, record.id()),
            kind,
            title: record.title(),
            subtitle: record.subtitle(),
            x,
            y,
            color: kind.color().to_string(),
            primary_link_key: record.link_key().map(str::to_string),
        }
    }

    fn normalized_key(&self) -> String {
        self.primary_link_key
            .as_deref()
            .map(normalize_key)
            .unwrap_or_default()
    }
}

/// An undirected person-to-record link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// Drawing surface size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: MIN_CANVAS_WIDTH,
            height: MIN_CANVAS_HEIGHT,
        }
    }
}

/// Grow the canvas to the furthest node plus padding, never below the minimum.
#[must_use]
pub fn canvas_size(nodes: &[GraphNode]) -> CanvasSize {
    nodes.iter().fold(CanvasSize::default(), |canvas, node| CanvasSize {
        width: canvas.width.max(node.x + CANVAS_PADDING),
        height: canvas.height.max(node.y + CANVAS_PADDING),
    })
}

/// Which person nodes receive edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAnchoring {
    /// Only the first matching person is linked (records pointing at any
    /// other matching person get no edge).
    #[default]
    FirstPerson,
    /// Every matching person is linked to the records pointing at it.
    AllPersons,
}

/// The board content for one search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub canvas: CanvasSize,
}

impl BoardGraph {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    /// Recompute the canvas after node positions changed.
    pub fn refit_canvas(&mut self) {
        self.canvas = canvas_size(&self.nodes);
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Build the board for `search` over `snapshot`.
///
/// An empty (or digit-free) search yields an empty board with the default
/// canvas. No match is not an error.
#[must_use]
pub fn build_graph(search: &str, snapshot: &Snapshot, anchoring: EdgeAnchoring) -> BoardGraph {
    let needle = normalize_key(search);
    if needle.is_empty() {
        return BoardGraph::default();
    }

    let mut nodes: Vec<GraphNode> = snapshot
        .records(RecordKind::Person)
        .iter()
        .filter(|p| p.link_key().is_some_and(|k| key_contains(k, &needle)))
        .map(|p| GraphNode::from_record(p, ANCHOR_X, ANCHOR_Y))
        .collect();

    let linked: Vec<&Record> = snapshot
        .linked_records()
        .filter(|r| r.link_key().is_some_and(|k| key_contains(k, &needle)))
        .collect();

    let step = if linked.is_empty() {
        0.0
    } else {
        TAU / linked.len() as f64
    };
    nodes.extend(linked.iter().enumerate().map(|(index, record)| {
        let angle = index as f64 * step;
        GraphNode::from_record(
            record,
            ANCHOR_X + RING_RADIUS * angle.cos(),
            ANCHOR_Y + RING_RADIUS * angle.sin(),
        )
    }));

    let edges = build_edges(&nodes, anchoring);
    let canvas = canvas_size(&nodes);
    BoardGraph {
        nodes,
        edges,
        canvas,
    }
}

/// Link non-person nodes to the anchoring person node(s) with an equal
/// normalized key. Person-person and record-record edges are never drawn.
fn build_edges(nodes: &[GraphNode], anchoring: EdgeAnchoring) -> Vec<GraphEdge> {
    let persons = nodes.iter().filter(|n| n.kind == RecordKind::Person);
    let anchors: Vec<&GraphNode> = match anchoring {
        EdgeAnchoring::FirstPerson => persons.take(1).collect(),
        EdgeAnchoring::AllPersons => persons.collect(),
    };

    let mut edges = Vec::new();
    for anchor in anchors {
        let anchor_key = anchor.normalized_key();
        if anchor_key.is_empty() {
            continue;
        }
        edges.extend(
            nodes
                .iter()
                .filter(|n| n.kind != RecordKind::Person && n.normalized_key() == anchor_key)
                .map(|n| GraphEdge {
                    from: anchor.id.clone(),
                    to: n.id.clone(),
                }),
        );
    }
    edges
}

// =============================================================================
// AUTOCOMPLETE
// =============================================================================

/// Distinct link keys containing the typed text, first-seen order, at most
/// [`MAX_SUGGESTIONS`].
#[must_use]
pub fn suggestions(typed: &str, snapshot: &Snapshot) -> Vec<String> {
    let needle = normalize_key(typed);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let records = snapshot
        .records(RecordKind::Person)
        .iter()
        .chain(snapshot.linked_records());

    for key in records.filter_map(Record::link_key) {
        if out.len() >= MAX_SUGGESTIONS {
            break;
        }
        if key_contains(key, &needle) && seen.insert(key) {
            out.push(key.to_string());
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
