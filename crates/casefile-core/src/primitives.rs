//! # Board Primitives
//!
//! Hardcoded runtime constants for the relationship board and the record store.
//!
//! These values are compiled into the binary and are immutable at runtime.
//!
//! ## Primitives
//!
//! 1. **Layout Primitive**: fixed anchor and ring radius for radial placement.
//! 2. **Canvas Primitive**: minimum surface size and padding around nodes.
//! 3. **Zoom Primitive**: multiplicative step and clamp range.

/// Anchor X coordinate. Every matching person node sits here.
pub const ANCHOR_X: f64 = 400.0;

/// Anchor Y coordinate. Every matching person node sits here.
pub const ANCHOR_Y: f64 = 300.0;

/// Radius of the ring on which linked records are placed around the anchor.
pub const RING_RADIUS: f64 = 250.0;

/// Minimum canvas width. The surface never shrinks below this.
pub const MIN_CANVAS_WIDTH: f64 = 1200.0;

/// Minimum canvas height. The surface never shrinks below this.
pub const MIN_CANVAS_HEIGHT: f64 = 800.0;

/// Margin added past the furthest node when the canvas grows.
pub const CANVAS_PADDING: f64 = 150.0;

/// Multiplicative zoom step (`zoom_in` multiplies, `zoom_out` divides).
pub const ZOOM_STEP: f64 = 1.2;

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.3;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Maximum number of autocomplete suggestions returned while typing.
pub const MAX_SUGGESTIONS: usize = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for any single text field of a record.
///
/// Fields longer than this are rejected by record validation.
pub const MAX_FIELD_LENGTH: usize = 65536;

/// Maximum number of files accepted by a single upload request.
pub const MAX_UPLOAD_FILES: usize = 10;

/// Maximum number of records accepted by a single bulk import.
pub const MAX_IMPORT_RECORDS: usize = 100_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_range_contains_identity() {
        assert!(MIN_ZOOM < 1.0 && 1.0 < MAX_ZOOM);
    }

    #[test]
    fn ring_fits_inside_minimum_canvas() {
        assert!(ANCHOR_X + RING_RADIUS + CANVAS_PADDING <= MIN_CANVAS_WIDTH);
        assert!(ANCHOR_Y + RING_RADIUS + CANVAS_PADDING <= MIN_CANVAS_HEIGHT);
    }
}
