// Widget placement engine: assigns, validates, and repairs widget geometry
// across add/remove, drag, resize, and breakpoint reflow.

mod geom;
mod slots;

pub use geom::{overlaps, snap, GridSpec};
pub use slots::is_occupied;

use tabdeck_core::{
    Breakpoint, LayoutState, Rect, Size, Vec2, WidgetGeometry, WidgetId,
};

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

/// Tunables for the placement engine. Thresholds live here rather than as
/// magic numbers; the defaults match the stock dashboard card dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    pub grid: GridSpec,
    /// Smallest width a resize can reach.
    pub min_width: f32,
    /// Smallest height a resize can reach.
    pub min_height: f32,
    /// Snap step for drag/resize geometry, or None for free positioning.
    /// Must divide the slot pitch for slots to stay reachable by dragging.
    pub snap_grid: Option<f32>,
    /// Pointer travel (per axis) below which a drop reverts as an
    /// accidental micro-move.
    pub revert_threshold: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            min_width: 200.0,
            min_height: 150.0,
            snap_grid: Some(10.0),
            revert_threshold: 2.0,
        }
    }
}

// ──────────────────────────────────────────────
// Gesture state machine
// ──────────────────────────────────────────────

/// One gesture at a time: a widget cannot be dragged and resized at once,
/// and a single pointer drives everything. Every `end_*` path returns the
/// engine to Idle so no gesture can leak past its pointer-up.
enum Gesture {
    Idle,
    Dragging {
        id: WidgetId,
        /// Pointer offset from the widget's top-left at press time.
        grab: Vec2,
        /// Pointer position at press time, for the micro-move check.
        press: Vec2,
        /// Geometry before the drag, restored verbatim on revert.
        origin: WidgetGeometry,
    },
    Resizing {
        id: WidgetId,
        press: Vec2,
        start_width: f32,
        start_height: f32,
    },
}

/// How a drag ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The drop stuck; `displaced` lists widgets relocated out of the way,
    /// in the order they were processed.
    Committed { displaced: Vec<WidgetId> },
    /// Micro-move: the widget is back at its pre-drag geometry.
    Reverted,
}

// ──────────────────────────────────────────────
// PlacementEngine
// ──────────────────────────────────────────────

pub struct PlacementEngine {
    config: PlacementConfig,
    viewport: Size,
    gesture: Gesture,
}

impl PlacementEngine {
    pub fn new(config: PlacementConfig, viewport: Size) -> Self {
        Self {
            config,
            viewport,
            gesture: Gesture::Idle,
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Columns of standard cells fitting the current viewport.
    pub fn columns(&self) -> usize {
        self.config.grid.columns_for_width(self.viewport.width)
    }

    /// Update the viewport. Crossing a breakpoint boundary triggers a full
    /// reflow and returns true; width changes within a breakpoint do not.
    pub fn set_viewport(&mut self, viewport: Size, state: &mut LayoutState) -> bool {
        self.viewport = viewport;
        let breakpoint = Breakpoint::from_width(viewport.width);
        if breakpoint == state.breakpoint {
            return false;
        }
        state.breakpoint = breakpoint;
        self.reflow(state);
        true
    }

    // ── Occupancy queries ──

    pub fn is_occupied(
        &self,
        state: &LayoutState,
        candidate: Rect,
        exclude: Option<WidgetId>,
    ) -> bool {
        slots::is_occupied(&state.widgets, candidate, exclude, self.config.grid.margin)
    }

    /// First free standard-sized slot in row-major order.
    pub fn find_next_free_slot(&self, state: &LayoutState, exclude: Option<WidgetId>) -> Vec2 {
        let occupied = self.occupied_rects(state, exclude);
        let size = Size::new(self.config.grid.cell_width, self.config.grid.cell_height);
        slots::first_free_slot(
            &occupied,
            &self.config.grid,
            self.columns(),
            self.viewport.width,
            size,
            self.config.grid.margin,
        )
    }

    /// Free slot nearest to `target` that can hold a widget of `size`.
    pub fn find_closest_free_slot(
        &self,
        state: &LayoutState,
        target: Vec2,
        size: Size,
        exclude: Option<WidgetId>,
    ) -> Vec2 {
        let occupied = self.occupied_rects(state, exclude);
        slots::closest_free_slot(
            &occupied,
            &self.config.grid,
            self.columns(),
            self.viewport.width,
            size,
            target,
            self.config.grid.margin,
        )
    }

    fn occupied_rects(&self, state: &LayoutState, exclude: Option<WidgetId>) -> Vec<Rect> {
        state
            .widgets
            .iter()
            .filter(|w| Some(w.id) != exclude)
            .map(|w| w.geometry.rect())
            .collect()
    }

    /// Default geometry for a widget about to be added: next free slot,
    /// standard cell size, stacked above everything placed so far.
    pub fn place_new(&self, state: &LayoutState) -> WidgetGeometry {
        let slot = self.find_next_free_slot(state, None);
        WidgetGeometry {
            x: slot.x,
            y: slot.y,
            width: self.config.grid.cell_width,
            height: self.config.grid.cell_height,
            z_index: state.max_z_index + 1,
        }
    }

    // ── Drag ──

    /// Start dragging. The widget comes to the front immediately; its
    /// pre-drag geometry is kept for the micro-move revert. Refused while
    /// another gesture is active.
    pub fn begin_drag(&mut self, state: &mut LayoutState, id: WidgetId, pointer: Vec2) -> bool {
        if !matches!(self.gesture, Gesture::Idle) {
            return false;
        }
        let origin = match state.widget(id) {
            Some(w) => w.geometry,
            None => return false,
        };
        state.bring_to_front(id);
        self.gesture = Gesture::Dragging {
            id,
            grab: Vec2::new(pointer.x - origin.x, pointer.y - origin.y),
            press: pointer,
            origin,
        };
        true
    }

    /// Move the dragged widget under the pointer: snapped, clamped, written
    /// as the live geometry. Other widgets are never moved mid-drag.
    /// Returns the live rect, or None when no drag is active.
    pub fn drag_to(&mut self, state: &mut LayoutState, pointer: Vec2) -> Option<Rect> {
        let (id, grab) = match &self.gesture {
            Gesture::Dragging { id, grab, .. } => (*id, *grab),
            _ => return None,
        };
        let width = state.widget(id)?.geometry.width;
        let (x, y) = self.resolve_position(pointer.x - grab.x, pointer.y - grab.y, width);
        let widget = state.widget_mut(id)?;
        widget.geometry.x = x;
        widget.geometry.y = y;
        Some(widget.geometry.rect())
    }

    /// Widgets the live drag geometry currently overlaps, for visual
    /// feedback (highlighting). Purely a query; nothing moves until drop.
    pub fn drag_overlaps(&self, state: &LayoutState) -> Vec<WidgetId> {
        let id = match &self.gesture {
            Gesture::Dragging { id, .. } => *id,
            _ => return Vec::new(),
        };
        let dragged = match state.widget(id) {
            Some(w) => w.geometry.rect(),
            None => return Vec::new(),
        };
        let margin = self.config.grid.margin;
        state
            .widgets
            .iter()
            .filter(|w| w.id != id && overlaps(w.geometry.rect(), dragged, margin))
            .map(|w| w.id)
            .collect()
    }

    /// Finish a drag. A net pointer travel under the revert threshold
    /// restores the pre-drag geometry verbatim; otherwise the drop commits
    /// and every overlapped widget is relocated to its closest free slot,
    /// one at a time in ascending id order so two displaced widgets cannot
    /// pick the same destination. Always returns the engine to Idle.
    pub fn end_drag(&mut self, state: &mut LayoutState, pointer: Vec2) -> Option<DropOutcome> {
        let (id, press, origin) = match &self.gesture {
            Gesture::Dragging { id, press, origin, .. } => (*id, *press, *origin),
            _ => return None,
        };
        self.gesture = Gesture::Idle;

        let threshold = self.config.revert_threshold;
        if (pointer.x - press.x).abs() < threshold && (pointer.y - press.y).abs() < threshold {
            if let Some(widget) = state.widget_mut(id) {
                widget.geometry = origin;
            }
            return Some(DropOutcome::Reverted);
        }

        // Final snap/clamp of the live geometry before it becomes durable.
        let dropped = {
            let (x, y, width) = {
                let g = &state.widget(id)?.geometry;
                (g.x, g.y, g.width)
            };
            let (x, y) = self.resolve_position(x, y, width);
            let widget = state.widget_mut(id)?;
            widget.geometry.x = x;
            widget.geometry.y = y;
            widget.geometry.rect()
        };

        let margin = self.config.grid.margin;
        let mut displaced: Vec<WidgetId> = state
            .widgets
            .iter()
            .filter(|w| w.id != id && overlaps(w.geometry.rect(), dropped, margin))
            .map(|w| w.id)
            .collect();
        displaced.sort_unstable();

        for &other in &displaced {
            let (seed, size) = match state.widget(other) {
                Some(w) => (
                    Vec2::new(w.geometry.x, w.geometry.y),
                    Size::new(w.geometry.width, w.geometry.height),
                ),
                None => continue,
            };
            let dest = self.find_closest_free_slot(state, seed, size, Some(other));
            if let Some(widget) = state.widget_mut(other) {
                widget.geometry.x = dest.x;
                widget.geometry.y = dest.y;
            }
        }

        Some(DropOutcome::Committed { displaced })
    }

    // ── Resize ──

    /// Start resizing from the widget's current dimensions. Refused while
    /// another gesture is active.
    pub fn begin_resize(&mut self, state: &LayoutState, id: WidgetId, pointer: Vec2) -> bool {
        if !matches!(self.gesture, Gesture::Idle) {
            return false;
        }
        let geometry = match state.widget(id) {
            Some(w) => w.geometry,
            None => return false,
        };
        self.gesture = Gesture::Resizing {
            id,
            press: pointer,
            start_width: geometry.width,
            start_height: geometry.height,
        };
        true
    }

    /// Track the resize handle: starting dimensions plus pointer delta,
    /// snapped, floored at the minimums, and kept inside the viewport
    /// horizontally. Growing over a neighbor is allowed; overlap left
    /// behind by a resize is not repaired.
    pub fn resize_to(&mut self, state: &mut LayoutState, pointer: Vec2) -> Option<Size> {
        let (id, press, start_width, start_height) = match &self.gesture {
            Gesture::Resizing { id, press, start_width, start_height } => {
                (*id, *press, *start_width, *start_height)
            }
            _ => return None,
        };
        let mut width = start_width + (pointer.x - press.x);
        let mut height = start_height + (pointer.y - press.y);
        if let Some(grid) = self.config.snap_grid {
            width = snap(width, grid);
            height = snap(height, grid);
        }
        let x = state.widget(id)?.geometry.x;
        let max_width = (self.viewport.width - x).max(self.config.min_width);
        width = width.clamp(self.config.min_width, max_width);
        height = height.max(self.config.min_height);

        let widget = state.widget_mut(id)?;
        widget.geometry.width = width;
        widget.geometry.height = height;
        Some(Size::new(width, height))
    }

    /// Finish a resize. The last live dimensions are already committed;
    /// this only releases the gesture.
    pub fn end_resize(&mut self) -> bool {
        if matches!(self.gesture, Gesture::Resizing { .. }) {
            self.gesture = Gesture::Idle;
            true
        } else {
            false
        }
    }

    // ── Reflow ──

    /// Full deterministic repack for the current viewport: every widget, in
    /// creation order, takes the first row-major position free with respect
    /// to the widgets already repacked. Prior freeform positions are
    /// discarded; sizes are kept, so oversized cards simply claim more
    /// slots. Running it twice yields the same layout.
    pub fn reflow(&self, state: &mut LayoutState) {
        let columns = self.columns();
        let margin = self.config.grid.margin;
        let mut placed: Vec<Rect> = Vec::with_capacity(state.widgets.len());
        for widget in &mut state.widgets {
            let size = Size::new(widget.geometry.width, widget.geometry.height);
            let pos = slots::first_free_slot(
                &placed,
                &self.config.grid,
                columns,
                self.viewport.width,
                size,
                margin,
            );
            widget.geometry.x = pos.x;
            widget.geometry.y = pos.y;
            placed.push(Rect::new(pos.x, pos.y, size.width, size.height));
        }
    }

    // ── Stored-state repair ──

    /// Re-place any widget whose persisted geometry fails the sanity check
    /// (non-finite numbers, negative position, non-positive size) and repair
    /// the id/z watermarks. Returns how many widgets were re-placed.
    pub fn sanitize(&self, state: &mut LayoutState) -> usize {
        let max_id = state.widgets.iter().map(|w| w.id).max().unwrap_or(0);
        if state.next_id <= max_id {
            state.next_id = max_id + 1;
        }
        let max_z = state.widgets.iter().map(|w| w.geometry.z_index).max().unwrap_or(0);
        if state.max_z_index < max_z {
            state.max_z_index = max_z;
        }

        let columns = self.columns();
        let margin = self.config.grid.margin;
        let size = Size::new(self.config.grid.cell_width, self.config.grid.cell_height);
        let mut repaired = 0;
        for idx in 0..state.widgets.len() {
            if geometry_is_sane(&state.widgets[idx].geometry) {
                continue;
            }
            // Occupancy only counts widgets that are themselves sane;
            // earlier repairs in this pass are included.
            let occupied: Vec<Rect> = state
                .widgets
                .iter()
                .enumerate()
                .filter(|(i, w)| *i != idx && geometry_is_sane(&w.geometry))
                .map(|(_, w)| w.geometry.rect())
                .collect();
            let pos = slots::first_free_slot(
                &occupied,
                &self.config.grid,
                columns,
                self.viewport.width,
                size,
                margin,
            );
            let widget = &mut state.widgets[idx];
            log::warn!("re-placing widget {} with malformed geometry", widget.id);
            widget.geometry.x = pos.x;
            widget.geometry.y = pos.y;
            widget.geometry.width = size.width;
            widget.geometry.height = size.height;
            repaired += 1;
        }
        repaired
    }

    // ── Helpers ──

    /// Snap then clamp a candidate position so the widget stays inside the
    /// viewport horizontally and below the top edge.
    fn resolve_position(&self, x: f32, y: f32, width: f32) -> (f32, f32) {
        let (mut x, mut y) = (x, y);
        if let Some(grid) = self.config.snap_grid {
            x = snap(x, grid);
            y = snap(y, grid);
        }
        let max_x = (self.viewport.width - width).max(0.0);
        (x.clamp(0.0, max_x), y.max(0.0))
    }
}

fn geometry_is_sane(g: &WidgetGeometry) -> bool {
    g.x.is_finite()
        && g.y.is_finite()
        && g.width.is_finite()
        && g.height.is_finite()
        && g.x >= 0.0
        && g.y >= 0.0
        && g.width > 0.0
        && g.height > 0.0
}
