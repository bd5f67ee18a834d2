use tabdeck_core::{Rect, Size, Vec2, Widget, WidgetId};

use crate::geom::{overlaps, GridSpec};

// ──────────────────────────────────────────────
// Occupancy queries
// ──────────────────────────────────────────────

/// True iff any widget other than `exclude` overlaps the candidate rect
/// (with the standing margin).
pub fn is_occupied(
    widgets: &[Widget],
    candidate: Rect,
    exclude: Option<WidgetId>,
    margin: f32,
) -> bool {
    widgets
        .iter()
        .any(|w| Some(w.id) != exclude && overlaps(w.geometry.rect(), candidate, margin))
}

/// Rows to scan before giving up and spilling below the layout. Covers twice
/// the occupied set so dense boards still find interior gaps.
fn search_rows(columns: usize, occupied: usize) -> usize {
    (occupied * 2) / columns.max(1) + 2
}

/// First free slot in row-major order (left to right, top to bottom) whose
/// rect of the given size clears every occupied rect and stays inside the
/// viewport. Columns are sized for the standard cell, so a widget the user
/// grew wider can poke past the right edge from a late column; those
/// candidates are skipped. Repeated calls without intervening moves fill the
/// board in a stable, predictable order.
pub(crate) fn first_free_slot(
    occupied: &[Rect],
    spec: &GridSpec,
    columns: usize,
    viewport_width: f32,
    size: Size,
    margin: f32,
) -> Vec2 {
    let rows = search_rows(columns, occupied.len());
    for row in 0..rows {
        for col in 0..columns {
            let origin = spec.slot_origin(col, row);
            if origin.x + size.width > viewport_width {
                continue;
            }
            let candidate = Rect::new(origin.x, origin.y, size.width, size.height);
            if !occupied.iter().any(|r| overlaps(*r, candidate, margin)) {
                return origin;
            }
        }
    }
    overflow_slot(occupied, spec, viewport_width, size.width)
}

/// Free slot minimizing Euclidean distance from `target` to the slot's
/// top-left corner. Ties keep the row-major earlier slot (lower row, then
/// lower column) because the scan only replaces on strictly smaller distance.
pub(crate) fn closest_free_slot(
    occupied: &[Rect],
    spec: &GridSpec,
    columns: usize,
    viewport_width: f32,
    size: Size,
    target: Vec2,
    margin: f32,
) -> Vec2 {
    let rows = search_rows(columns, occupied.len());
    let mut best: Option<(f32, Vec2)> = None;
    for row in 0..rows {
        for col in 0..columns {
            let origin = spec.slot_origin(col, row);
            if origin.x + size.width > viewport_width {
                continue;
            }
            let candidate = Rect::new(origin.x, origin.y, size.width, size.height);
            if occupied.iter().any(|r| overlaps(*r, candidate, margin)) {
                continue;
            }
            let dx = origin.x - target.x;
            let dy = origin.y - target.y;
            let dist = dx * dx + dy * dy;
            if best.map_or(true, |(b, _)| dist < b) {
                best = Some((dist, origin));
            }
        }
    }
    match best {
        Some((_, origin)) => origin,
        None => overflow_slot(occupied, spec, viewport_width, size.width),
    }
}

/// Fallback when the bounded scan finds nothing: the row below the lowest
/// occupied rect. The board grows downward without limit, so placement
/// never fails. A widget too wide even for the first column is pushed left
/// of the origin so it still ends flush with the right edge where possible.
fn overflow_slot(occupied: &[Rect], spec: &GridSpec, viewport_width: f32, width: f32) -> Vec2 {
    let bottom = occupied
        .iter()
        .fold(spec.origin_y - spec.margin, |acc, r| acc.max(r.bottom()));
    let x = spec.origin_x.min((viewport_width - width).max(0.0));
    Vec2::new(x, bottom + spec.margin)
}
