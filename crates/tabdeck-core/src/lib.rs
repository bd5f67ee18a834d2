// ──────────────────────────────────────────────
// Geometry
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ──────────────────────────────────────────────
// Identity
// ──────────────────────────────────────────────

pub type WidgetId = u64;

// ──────────────────────────────────────────────
// Widgets
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Notes,
    Links,
    Todos,
    Rss,
}

impl WidgetKind {
    /// Title a freshly added widget of this kind starts with.
    pub fn default_title(&self) -> &'static str {
        match self {
            WidgetKind::Notes => "Notes",
            WidgetKind::Links => "Quick Links",
            WidgetKind::Todos => "Todo List",
            WidgetKind::Rss => "RSS Feeds",
        }
    }
}

/// Position, size, and stacking order of a single widget card.
/// Coordinates are pixels relative to the board origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub z_index: u32,
}

impl WidgetGeometry {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// A placed card. The layout engine owns `geometry`; `content` is an opaque
/// blob owned by the matching content component and is only carried through
/// serialization here.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub title: String,
    pub content: String,
    pub geometry: WidgetGeometry,
}

// ──────────────────────────────────────────────
// Breakpoints
// ──────────────────────────────────────────────

/// Named viewport-width range. Crossing a boundary triggers a full reflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    Lg,
    Md,
    Sm,
    Xs,
    Xxs,
}

impl Breakpoint {
    pub fn from_width(width: f32) -> Self {
        if width >= 1200.0 {
            Breakpoint::Lg
        } else if width >= 996.0 {
            Breakpoint::Md
        } else if width >= 768.0 {
            Breakpoint::Sm
        } else if width >= 480.0 {
            Breakpoint::Xs
        } else {
            Breakpoint::Xxs
        }
    }
}

// ──────────────────────────────────────────────
// Layout state
// ──────────────────────────────────────────────

/// The authoritative widget table. Insertion order is creation order and is
/// preserved across save/load; ids are never reused within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutState {
    pub widgets: Vec<Widget>,
    pub next_id: WidgetId,
    pub max_z_index: u32,
    pub breakpoint: Breakpoint,
}

impl LayoutState {
    pub fn new() -> Self {
        Self {
            widgets: Vec::new(),
            next_id: 1,
            max_z_index: 0,
            breakpoint: Breakpoint::Lg,
        }
    }

    pub fn alloc_id(&mut self) -> WidgetId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.id == id)
    }

    /// Raise the widget above everything else. The z watermark strictly
    /// increases so a later bring-to-front always wins.
    pub fn bring_to_front(&mut self, id: WidgetId) -> bool {
        let new_z = self.max_z_index + 1;
        match self.widget_mut(id) {
            Some(widget) => {
                widget.geometry.z_index = new_z;
                self.max_z_index = new_z;
                true
            }
            None => false,
        }
    }

    /// Remove the widget. Other widgets keep their ids and geometry; the
    /// freed area becomes available to the slot finder.
    pub fn remove(&mut self, id: WidgetId) -> bool {
        let before = self.widgets.len();
        self.widgets.retain(|w| w.id != id);
        self.widgets.len() != before
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial geometry update. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub z_index: Option<u32>,
}

impl GeometryPatch {
    pub fn apply(&self, geometry: &mut WidgetGeometry) {
        if let Some(x) = self.x {
            geometry.x = x;
        }
        if let Some(y) = self.y {
            geometry.y = y;
        }
        if let Some(width) = self.width {
            geometry.width = width;
        }
        if let Some(height) = self.height {
            geometry.height = height;
        }
        if let Some(z_index) = self.z_index {
            geometry.z_index = z_index;
        }
    }
}

// ──────────────────────────────────────────────
// Trait: PersistenceAdapter
// ──────────────────────────────────────────────

/// Opaque load/save of the serialized layout. The store calls `save` after
/// every mutation; `load` returns None for absent or unusable data and the
/// caller falls back to the default layout.
pub trait PersistenceAdapter {
    fn load(&self, key: &str) -> Option<LayoutState>;
    fn save(&self, key: &str, state: &LayoutState);
}
