use tabdeck_core::{Rect, Vec2};

// ──────────────────────────────────────────────
// Rectangle overlap
// ──────────────────────────────────────────────

/// Separating-axis overlap test with a standing margin. Two rects whose gap
/// equals the margin exactly do not overlap.
pub fn overlaps(a: Rect, b: Rect, margin: f32) -> bool {
    let separated = a.right() + margin <= b.x
        || b.right() + margin <= a.x
        || a.bottom() + margin <= b.y
        || b.bottom() + margin <= a.y;
    !separated
}

// ──────────────────────────────────────────────
// Grid snapping
// ──────────────────────────────────────────────

/// Round to the nearest multiple of `grid`. Ties round half away from zero
/// (`f32::round` semantics); drag preview and commit use the same rounding so
/// the card never jitters between the two. A non-positive grid disables
/// snapping and returns the value unchanged.
pub fn snap(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

// ──────────────────────────────────────────────
// GridSpec: slot grid ↔ pixel projection
// ──────────────────────────────────────────────

/// The virtual slot grid: standard-sized cells separated by a margin,
/// offset from the board origin. Slots are the placement candidates the
/// occupancy index scans; everything else stays in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub cell_width: f32,
    pub cell_height: f32,
    pub margin: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl GridSpec {
    fn pitch_x(&self) -> f32 {
        self.cell_width + self.margin
    }

    fn pitch_y(&self) -> f32 {
        self.cell_height + self.margin
    }

    /// How many columns of standard cells fit in the viewport. Never zero,
    /// so a pathologically narrow window still lays out a single column.
    pub fn columns_for_width(&self, viewport_width: f32) -> usize {
        let usable = viewport_width - self.origin_x + self.margin;
        ((usable / self.pitch_x()).floor() as usize).max(1)
    }

    /// Pixel position of a slot's top-left corner.
    pub fn slot_origin(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new(
            self.origin_x + col as f32 * self.pitch_x(),
            self.origin_y + row as f32 * self.pitch_y(),
        )
    }

    /// Nearest cell to a pixel point. Exact left-inverse of `slot_origin`
    /// for integer cells; points left of or above the origin clamp to cell 0.
    pub fn cell_at(&self, point: Vec2) -> (usize, usize) {
        let col = ((point.x - self.origin_x) / self.pitch_x()).round().max(0.0) as usize;
        let row = ((point.y - self.origin_y) / self.pitch_y()).round().max(0.0) as usize;
        (col, row)
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cell_width: 310.0,
            cell_height: 400.0,
            margin: 20.0,
            origin_x: 20.0,
            origin_y: 20.0,
        }
    }
}
