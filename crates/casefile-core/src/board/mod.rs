//! # Board Module
//!
//! The relationship board: graph construction from soft keys and the
//! interactive surface that renders it.

pub mod graph;
pub mod surface;

pub use graph::{
    BoardGraph, CanvasSize, EdgeAnchoring, GraphEdge, GraphNode, NodeId, build_graph,
    canvas_size, normalize_key, suggestions,
};
pub use surface::{
    BoardSurface, DragState, EditField, EditForm, FieldInput, Point, PointerButton, SaveRequest,
    Zoom,
};
