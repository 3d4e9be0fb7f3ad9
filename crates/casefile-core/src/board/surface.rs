//! # Interactive Board Surface
//!
//! Client-side state of the board: search input and suggestions, the built
//! graph, the drag gesture, the zoom factor, and the edit modal.
//!
//! ## Drag gesture
//!
//! ```text
//!            pointer_down(node, Primary)
//!   Idle ───────────────────────────────▶ Dragging { node, last }
//!    ▲                                        │  pointer_move: node += delta / zoom
//!    └──────── pointer_up / pointer_leave ◀───┘
//! ```
//!
//! Drag positions live only in this surface. Any rebuild (new search or
//! changed collections) discards them.
//!
//! ## Zoom
//!
//! A presentation scale around the canvas centre. It never touches node
//! coordinates.

use super::graph::{
    BoardGraph, EdgeAnchoring, GraphEdge, GraphNode, NodeId, build_graph, suggestions,
};
use crate::primitives::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use crate::{CasefileError, Record, RecordId, RecordKind, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// =============================================================================
// POINTER INPUT
// =============================================================================

/// Pointer position in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// State of the single drag gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        node: NodeId,
        /// Pointer position at the previous event.
        last: Point,
    },
}

// =============================================================================
// ZOOM
// =============================================================================

/// Zoom factor clamped to `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom(f64);

impl Default for Zoom {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Zoom {
    #[must_use]
    pub fn factor(self) -> f64 {
        self.0
    }

    pub fn zoom_in(&mut self) {
        self.0 = (self.0 * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.0 = (self.0 / ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn reset(&mut self) {
        self.0 = 1.0;
    }

    /// CSS transform applied to the canvas (origin: centre).
    #[must_use]
    pub fn css_transform(self) -> String {
        format!("scale({})", self.0)
    }
}

// =============================================================================
// EDIT MODAL
// =============================================================================

/// How a field is entered. Numeric inputs are validated on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldInput {
    Text,
    TextArea,
    Integer,
    Decimal,
}

/// One input of the edit modal. `name` is the record's JSON field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditField {
    pub name: &'static str,
    pub label: &'static str,
    pub input: FieldInput,
    pub value: String,
    /// Whether the record carried a value for this field when opened.
    pub present: bool,
}

/// The open edit modal: the persisted record and its field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditForm {
    pub record: Record,
    pub fields: Vec<EditField>,
}

/// An edit routed to the update operation of the record's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub kind: RecordKind,
    pub id: RecordId,
    /// Version the edit was based on.
    pub version: u64,
    pub patch: Map<String, Value>,
}

impl SaveRequest {
    /// `PUT` path of the update operation.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/api/{}/{}", self.kind.collection(), self.id.0)
    }
}

type FieldSpec = (&'static str, &'static str, FieldInput);

/// Field set of the edit modal for each kind.
fn field_specs(kind: RecordKind) -> &'static [FieldSpec] {
    use FieldInput::{Decimal, Integer, Text, TextArea};
    match kind {
        RecordKind::Person => &[
            ("key", "CPF", Text),
            ("displayName", "Name", Text),
            ("nickname", "Nickname", Text),
            ("category", "Category", Text),
            ("criminalHistory", "Criminal history", TextArea),
            ("photoUrl", "Photo URL", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::Company => &[
            ("cnpj", "CNPJ", Text),
            ("name", "Company name", Text),
            ("tradeName", "Trade name", Text),
            ("primaryLinkKey", "Linked CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::Property => &[
            ("address", "Address", Text),
            ("registry", "Registry", Text),
            ("propertyType", "Type", Text),
            ("primaryLinkKey", "Linked CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::Vehicle => &[
            ("plate", "Plate", Text),
            ("model", "Model", Text),
            ("color", "Color", Text),
            ("year", "Year", Integer),
            ("primaryLinkKey", "Linked CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::Phone => &[
            ("number", "Number", Text),
            ("carrier", "Carrier", Text),
            ("primaryLinkKey", "Linked CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::SocialProfile => &[
            ("platform", "Platform", Text),
            ("handle", "Handle", Text),
            ("url", "URL", Text),
            ("primaryLinkKey", "Linked CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::FinancialTransaction => &[
            ("description", "Description", Text),
            ("amountCents", "Amount (cents)", Integer),
            ("date", "Date", Text),
            ("primaryLinkKey", "Linked CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::CorporateAffiliation => &[
            ("companyCnpj", "Company CNPJ", Text),
            ("companyName", "Company name", Text),
            ("role", "Role", Text),
            ("involvedKey", "Involved CPF", Text),
            ("notes", "Notes", TextArea),
        ],
        RecordKind::Occurrence => &[
            ("title", "Title", Text),
            ("occurrenceType", "Type", Text),
            ("severity", "Severity", Text),
            ("status", "Status", Text),
            ("unit", "Unit", Text),
            ("responsible", "Responsible", Text),
            ("latitude", "Latitude", Decimal),
            ("longitude", "Longitude", Decimal),
            ("occurredAt", "Date", Text),
            ("description", "Description", TextArea),
        ],
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl EditForm {
    /// Open the form for a persisted record.
    pub fn for_record(record: Record) -> Result<Self, CasefileError> {
        let body = record.to_json()?;
        let fields = field_specs(record.kind())
            .iter()
            .map(|&(name, label, input)| EditField {
                name,
                label,
                input,
                value: display_value(body.get(name)),
                present: body.get(name).is_some_and(|v| !v.is_null()),
            })
            .collect();
        Ok(Self { record, fields })
    }

    /// Build the update for the edited values. Fields absent from `edits`
    /// keep their current value.
    pub fn save(&self, edits: &BTreeMap<String, String>) -> Result<SaveRequest, CasefileError> {
        let mut patch = Map::new();
        for field in &self.fields {
            let raw = edits.get(field.name).unwrap_or(&field.value);
            let raw = match field.input {
                FieldInput::TextArea => raw.as_str(),
                _ => raw.trim(),
            };
            patch.insert(field.name.to_string(), parse_input(field, raw)?);
        }
        let meta = self.record.meta();
        Ok(SaveRequest {
            kind: self.record.kind(),
            id: meta.id,
            version: meta.version,
            patch,
        })
    }
}

fn parse_input(field: &EditField, raw: &str) -> Result<Value, CasefileError> {
    let not_a_number =
        || CasefileError::InvalidRecord(format!("{} must be a number", field.label));
    match field.input {
        FieldInput::Text | FieldInput::TextArea if raw.is_empty() && !field.present => {
            Ok(Value::Null)
        }
        FieldInput::Text | FieldInput::TextArea => Ok(Value::String(raw.to_string())),
        FieldInput::Integer if raw.is_empty() => Ok(Value::Null),
        FieldInput::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| not_a_number()),
        FieldInput::Decimal if raw.is_empty() => Ok(Value::Null),
        FieldInput::Decimal => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(not_a_number),
    }
}

// =============================================================================
// BOARD SURFACE
// =============================================================================

/// Everything the board screen holds between events.
#[derive(Debug, Clone, Default)]
pub struct BoardSurface {
    anchoring: EdgeAnchoring,
    input: String,
    submitted: String,
    suggestions: Vec<String>,
    graph: BoardGraph,
    drag: DragState,
    zoom: Zoom,
    editor: Option<EditForm>,
}

impl BoardSurface {
    #[must_use]
    pub fn new(anchoring: EdgeAnchoring) -> Self {
        Self {
            anchoring,
            ..Self::default()
        }
    }

    // --- search -------------------------------------------------------------

    /// Keystroke: update the input and the suggestion list. Does not search.
    pub fn type_search(&mut self, text: &str, snapshot: &Snapshot) {
        self.input = text.to_string();
        self.suggestions = suggestions(text, snapshot);
    }

    /// Submit (button or Enter): rebuild the board for the current input.
    pub fn submit_search(&mut self, snapshot: &Snapshot) {
        self.submitted = self.input.clone();
        self.suggestions.clear();
        self.rebuild(snapshot);
    }

    /// Pick a suggestion: it becomes the input and is submitted.
    pub fn choose_suggestion(&mut self, suggestion: &str, snapshot: &Snapshot) {
        self.input = suggestion.to_string();
        self.submit_search(snapshot);
    }

    /// Clear input and board; the canvas returns to its minimum size.
    pub fn clear_search(&mut self) {
        self.input.clear();
        self.submitted.clear();
        self.suggestions.clear();
        self.graph = BoardGraph::default();
        self.drag = DragState::Idle;
    }

    /// Collections changed: rebuild for the last submitted search.
    pub fn refresh(&mut self, snapshot: &Snapshot) {
        self.rebuild(snapshot);
    }

    fn rebuild(&mut self, snapshot: &Snapshot) {
        self.graph = build_graph(&self.submitted, snapshot, self.anchoring);
        self.drag = DragState::Idle;
    }

    // --- drag ---------------------------------------------------------------

    /// Start dragging `node`. Only the primary button over an existing node
    /// starts a drag. Returns whether a drag started.
    pub fn pointer_down(&mut self, node: &NodeId, button: PointerButton, at: Point) -> bool {
        if button != PointerButton::Primary || self.graph.node(node).is_none() {
            return false;
        }
        self.drag = DragState::Dragging {
            node: node.clone(),
            last: at,
        };
        true
    }

    /// Move the dragged node by the pointer delta, in canvas units.
    pub fn pointer_move(&mut self, at: Point) {
        let DragState::Dragging { node, last } = &mut self.drag else {
            return;
        };
        let zoom = self.zoom.factor();
        let (dx, dy) = ((at.x - last.x) / zoom, (at.y - last.y) / zoom);
        *last = at;
        if let Some(target) = self.graph.node_mut(node) {
            target.x += dx;
            target.y += dy;
        }
        self.graph.refit_canvas();
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.drag = DragState::Idle;
    }

    // --- zoom ---------------------------------------------------------------

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
    }

    // --- edit modal ---------------------------------------------------------

    /// Edit control pressed on a node. Never starts or alters a drag.
    ///
    /// Looks up the persisted record behind the node and opens the modal.
    pub fn edit_pressed(
        &mut self,
        node: &NodeId,
        snapshot: &Snapshot,
    ) -> Result<&EditForm, CasefileError> {
        let (kind, id) = node.parse()?;
        let record = snapshot
            .find(kind, id)
            .cloned()
            .ok_or(CasefileError::RecordNotFound(kind, id))?;
        Ok(self.editor.insert(EditForm::for_record(record)?))
    }

    /// Save the modal. On success the modal closes and the update to route
    /// is returned; on invalid input the modal stays open.
    pub fn save_edit(
        &mut self,
        edits: &BTreeMap<String, String>,
    ) -> Result<SaveRequest, CasefileError> {
        let form = self
            .editor
            .as_ref()
            .ok_or_else(|| CasefileError::InvalidRecord("no record is being edited".to_string()))?;
        let request = form.save(edits)?;
        self.editor = None;
        Ok(request)
    }

    pub fn cancel_edit(&mut self) {
        self.editor = None;
    }

    // --- accessors ----------------------------------------------------------

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn suggestion_list(&self) -> &[String] {
        &self.suggestions
    }

    #[must_use]
    pub fn graph(&self) -> &BoardGraph {
        &self.graph
    }

    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.graph.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.graph.edges
    }

    #[must_use]
    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    #[must_use]
    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    #[must_use]
    pub fn editor(&self) -> Option<&EditForm> {
        self.editor.as_ref()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::graph::CanvasSize;
    use crate::primitives::{ANCHOR_X, ANCHOR_Y};
    use serde_json::json;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.push(
            Record::from_json(
                RecordKind::Person,
                json!({"id": 1, "version": 3, "key": "12345678900", "displayName": "Jane Doe"}),
            )
            .expect("parse"),
        );
        snapshot.push(
            Record::from_json(
                RecordKind::Vehicle,
                json!({"id": 7, "version": 1, "plate": "ABC1234", "year": 2019,
                       "primaryLinkKey": "123.456.789-00"}),
            )
            .expect("parse"),
        );
        snapshot
    }

    fn searched() -> (BoardSurface, Snapshot) {
        let snapshot = snapshot();
        let mut board = BoardSurface::new(EdgeAnchoring::FirstPerson);
        board.type_search("123.456.789-00", &snapshot);
        board.submit_search(&snapshot);
        (board, snapshot)
    }

    #[test]
    fn typing_only_suggests() {
        let snapshot = snapshot();
        let mut board = BoardSurface::default();
        board.type_search("123", &snapshot);
        assert!(board.nodes().is_empty());
        assert_eq!(
            board.suggestion_list(),
            ["12345678900".to_string(), "123.456.789-00".to_string()]
        );
    }

    #[test]
    fn submit_builds_and_clear_resets() {
        let (mut board, _) = searched();
        assert_eq!(board.nodes().len(), 2);
        assert_eq!(board.edges().len(), 1);

        board.clear_search();
        assert!(board.nodes().is_empty());
        assert_eq!(board.graph().canvas, CanvasSize::default());
    }

    #[test]
    fn drag_moves_node_by_delta() {
        let (mut board, _) = searched();
        let person = NodeId::from("persons-1");
        assert!(board.pointer_down(&person, PointerButton::Primary, Point::new(10.0, 10.0)));
        board.pointer_move(Point::new(30.0, 5.0));
        board.pointer_move(Point::new(40.0, 15.0));
        board.pointer_up();

        let node = board.graph().node(&person).expect("node");
        assert_eq!((node.x, node.y), (ANCHOR_X + 30.0, ANCHOR_Y + 5.0));
        assert_eq!(board.drag_state(), &DragState::Idle);
    }

    #[test]
    fn drag_is_zoom_invariant() {
        let (mut board, _) = searched();
        board.zoom_in();
        board.zoom_in();
        let zoom = board.zoom().factor();
        let person = NodeId::from("persons-1");
        board.pointer_down(&person, PointerButton::Primary, Point::new(0.0, 0.0));
        board.pointer_move(Point::new(100.0, 0.0));
        let node = board.graph().node(&person).expect("node");
        assert!((node.x - (ANCHOR_X + 100.0 / zoom)).abs() < 1e-9);
    }

    #[test]
    fn secondary_button_does_not_drag() {
        let (mut board, _) = searched();
        let person = NodeId::from("persons-1");
        assert!(!board.pointer_down(&person, PointerButton::Secondary, Point::default()));
        board.pointer_move(Point::new(50.0, 50.0));
        let node = board.graph().node(&person).expect("node");
        assert_eq!((node.x, node.y), (ANCHOR_X, ANCHOR_Y));
    }

    #[test]
    fn pointer_leave_ends_drag() {
        let (mut board, _) = searched();
        let person = NodeId::from("persons-1");
        board.pointer_down(&person, PointerButton::Primary, Point::default());
        board.pointer_leave();
        board.pointer_move(Point::new(50.0, 50.0));
        let node = board.graph().node(&person).expect("node");
        assert_eq!((node.x, node.y), (ANCHOR_X, ANCHOR_Y));
    }

    #[test]
    fn unknown_node_does_not_drag() {
        let (mut board, _) = searched();
        assert!(!board.pointer_down(
            &NodeId::from("persons-99"),
            PointerButton::Primary,
            Point::default()
        ));
    }

    #[test]
    fn refresh_discards_drag_positions() {
        let (mut board, snapshot) = searched();
        let person = NodeId::from("persons-1");
        board.pointer_down(&person, PointerButton::Primary, Point::default());
        board.pointer_move(Point::new(500.0, 500.0));
        board.pointer_up();
        board.refresh(&snapshot);
        let node = board.graph().node(&person).expect("node");
        assert_eq!((node.x, node.y), (ANCHOR_X, ANCHOR_Y));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut zoom = Zoom::default();
        for _ in 0..50 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.factor(), MAX_ZOOM);
        for _ in 0..50 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.factor(), MIN_ZOOM);
        zoom.reset();
        assert_eq!(zoom.css_transform(), "scale(1)");
    }

    #[test]
    fn zoom_leaves_coordinates_alone() {
        let (mut board, _) = searched();
        let before = board.nodes().to_vec();
        board.zoom_in();
        board.zoom_out();
        board.zoom_out();
        assert_eq!(board.nodes(), before.as_slice());
    }

    #[test]
    fn edit_opens_kind_specific_form() {
        let (mut board, snapshot) = searched();
        let person = NodeId::from("persons-1");
        board.pointer_down(&person, PointerButton::Primary, Point::default());
        board.pointer_up();

        let form = board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        assert_eq!(form.record.kind(), RecordKind::Vehicle);
        let names: Vec<_> = form.fields.iter().map(|f| f.name).collect();
        assert!(names.contains(&"plate"));
        assert!(!names.contains(&"cnpj"));
        let year = form.fields.iter().find(|f| f.name == "year").expect("year");
        assert_eq!(year.value, "2019");
        assert_eq!(board.drag_state(), &DragState::Idle);
    }

    #[test]
    fn edit_does_not_interrupt_drag_state() {
        let (mut board, snapshot) = searched();
        let person = NodeId::from("persons-1");
        board.pointer_down(&person, PointerButton::Primary, Point::default());
        board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        assert!(matches!(board.drag_state(), DragState::Dragging { .. }));
    }

    #[test]
    fn save_routes_to_record_collection() {
        let (mut board, snapshot) = searched();
        board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        let edits = BTreeMap::from([
            ("plate".to_string(), "XYZ9876".to_string()),
            ("year".to_string(), " 2021 ".to_string()),
        ]);
        let request = board.save_edit(&edits).expect("save");
        assert_eq!(request.kind, RecordKind::Vehicle);
        assert_eq!(request.id, RecordId(7));
        assert_eq!(request.version, 1);
        assert_eq!(request.path(), "/api/vehicles/7");
        assert_eq!(request.patch["plate"], "XYZ9876");
        assert_eq!(request.patch["year"], 2021);
        assert_eq!(request.patch["primaryLinkKey"], "123.456.789-00");
        assert!(board.editor().is_none());
    }

    #[test]
    fn invalid_number_keeps_modal_open() {
        let (mut board, snapshot) = searched();
        board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        let edits = BTreeMap::from([("year".to_string(), "soon".to_string())]);
        assert!(board.save_edit(&edits).is_err());
        assert!(board.editor().is_some());
    }

    #[test]
    fn empty_number_clears_field() {
        let (mut board, snapshot) = searched();
        board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        let edits = BTreeMap::from([("year".to_string(), String::new())]);
        let request = board.save_edit(&edits).expect("save");
        assert_eq!(request.patch["year"], Value::Null);
    }

    #[test]
    fn unset_text_fields_stay_unset() {
        let (mut board, snapshot) = searched();
        board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        let request = board.save_edit(&BTreeMap::new()).expect("save");
        assert_eq!(request.patch["model"], Value::Null);
        assert_eq!(request.patch["notes"], Value::Null);
        assert_eq!(request.patch["plate"], "ABC1234");
    }

    #[test]
    fn notes_keep_surrounding_whitespace() {
        let (mut board, snapshot) = searched();
        board
            .edit_pressed(&NodeId::from("vehicles-7"), &snapshot)
            .expect("open");
        let edits = BTreeMap::from([
            ("notes".to_string(), "  seen twice\n".to_string()),
            ("color".to_string(), " red ".to_string()),
        ]);
        let request = board.save_edit(&edits).expect("save");
        assert_eq!(request.patch["notes"], "  seen twice\n");
        assert_eq!(request.patch["color"], "red");
    }

    #[test]
    fn cleared_text_field_is_sent_empty() {
        let (mut board, snapshot) = searched();
        board
            .edit_pressed(&NodeId::from("persons-1"), &snapshot)
            .expect("open");
        let edits = BTreeMap::from([("displayName".to_string(), String::new())]);
        let request = board.save_edit(&edits).expect("save");
        assert_eq!(request.patch["displayName"], "");
        assert_eq!(request.patch["nickname"], Value::Null);
    }

    #[test]
    fn edit_of_missing_record_fails() {
        let (mut board, snapshot) = searched();
        assert!(matches!(
            board.edit_pressed(&NodeId::from("phones-1"), &snapshot),
            Err(CasefileError::RecordNotFound(RecordKind::Phone, RecordId(1)))
        ));
        assert!(board.editor().is_none());
    }

    #[test]
    fn every_kind_has_a_field_set() {
        for kind in RecordKind::ALL {
            assert!(!field_specs(kind).is_empty(), "{kind} has no fields");
        }
    }
}
