// Authoritative layout store: the widget table plus z watermark, with every
// mutation persisted through the injected adapter.

mod persist;

pub use persist::{FileStore, STORAGE_KEY};

use persist::{state_to_stored, stored_to_state, unix_now, Backup};
use tabdeck_core::{
    Breakpoint, GeometryPatch, LayoutState, PersistenceAdapter, Rect, Size, Vec2, Widget,
    WidgetId, WidgetKind,
};
use tabdeck_layout::{DropOutcome, PlacementConfig, PlacementEngine};

// ──────────────────────────────────────────────
// Default board
// ──────────────────────────────────────────────

/// The hard-coded starter board: notes, todos, and links side by side,
/// placed by the engine's row-major fill. Used on first run and whenever
/// persisted data is absent or unusable.
pub fn default_state(engine: &PlacementEngine) -> LayoutState {
    let mut state = LayoutState::new();
    state.breakpoint = Breakpoint::from_width(engine.viewport().width);
    for kind in [WidgetKind::Notes, WidgetKind::Todos, WidgetKind::Links] {
        spawn_widget(&mut state, engine, kind);
    }
    state
}

fn spawn_widget(state: &mut LayoutState, engine: &PlacementEngine, kind: WidgetKind) -> WidgetId {
    let geometry = engine.place_new(state);
    let id = state.alloc_id();
    state.max_z_index = geometry.z_index;
    state.widgets.push(Widget {
        id,
        kind,
        title: kind.default_title().to_string(),
        content: String::new(),
        geometry,
    });
    id
}

// ──────────────────────────────────────────────
// LayoutStore
// ──────────────────────────────────────────────

/// Owns the layout state and the placement engine, and funnels every user
/// operation through them. Mutations are synchronous and immediately
/// visible; each one saves through the adapter before returning.
pub struct LayoutStore<P: PersistenceAdapter> {
    state: LayoutState,
    engine: PlacementEngine,
    adapter: P,
}

impl<P: PersistenceAdapter> LayoutStore<P> {
    /// Load persisted state (repairing anything malformed) or fall back to
    /// the default board. A stored breakpoint that no longer matches the
    /// current viewport triggers an immediate reflow. Any repair or reflow
    /// is written straight back so the stored record does not stay stale
    /// until the next mutation.
    pub fn open(adapter: P, config: PlacementConfig, viewport: Size) -> Self {
        let engine = PlacementEngine::new(config, viewport);
        let mut state = match adapter.load(STORAGE_KEY) {
            Some(state) => state,
            None => default_state(&engine),
        };
        let repaired = engine.sanitize(&mut state);
        let breakpoint = Breakpoint::from_width(viewport.width);
        let reflowed = state.breakpoint != breakpoint;
        if reflowed {
            state.breakpoint = breakpoint;
            engine.reflow(&mut state);
        }
        let store = Self {
            state,
            engine,
            adapter,
        };
        if repaired > 0 || reflowed {
            store.save();
        }
        store
    }

    fn save(&self) {
        self.adapter.save(STORAGE_KEY, &self.state);
    }

    // ── Reads ──

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.state.widgets
    }

    pub fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.state.widget(id)
    }

    pub fn max_z_index(&self) -> u32 {
        self.state.max_z_index
    }

    pub fn engine(&self) -> &PlacementEngine {
        &self.engine
    }

    pub fn adapter(&self) -> &P {
        &self.adapter
    }

    // ── Mutations ──

    /// Create a widget of the given kind in the next free slot, stacked on
    /// top, with the kind's default title. Never fails; with no room left
    /// the board grows downward.
    pub fn add_widget(&mut self, kind: WidgetKind) -> WidgetId {
        let id = spawn_widget(&mut self.state, &self.engine, kind);
        self.save();
        id
    }

    /// Delete a widget. Remaining widgets keep their ids and geometry.
    pub fn remove_widget(&mut self, id: WidgetId) -> bool {
        let removed = self.state.remove(id);
        if removed {
            self.save();
        }
        removed
    }

    /// Apply a partial geometry update verbatim. Gesture-driven moves go
    /// through the drag/resize entry points instead, which snap and clamp.
    pub fn update_geometry(&mut self, id: WidgetId, patch: GeometryPatch) -> bool {
        match self.state.widget_mut(id) {
            Some(widget) => {
                patch.apply(&mut widget.geometry);
                self.save();
                true
            }
            None => false,
        }
    }

    pub fn set_title(&mut self, id: WidgetId, title: &str) -> bool {
        match self.state.widget_mut(id) {
            Some(widget) => {
                widget.title = title.to_string();
                self.save();
                true
            }
            None => false,
        }
    }

    /// Replace the opaque content blob. Content components call this; the
    /// store never inspects the value.
    pub fn set_content(&mut self, id: WidgetId, content: &str) -> bool {
        match self.state.widget_mut(id) {
            Some(widget) => {
                widget.content = content.to_string();
                self.save();
                true
            }
            None => false,
        }
    }

    pub fn bring_to_front(&mut self, id: WidgetId) -> bool {
        let raised = self.state.bring_to_front(id);
        if raised {
            self.save();
        }
        raised
    }

    // ── Gestures ──

    pub fn begin_drag(&mut self, id: WidgetId, pointer: Vec2) -> bool {
        self.engine.begin_drag(&mut self.state, id, pointer)
    }

    pub fn drag_to(&mut self, pointer: Vec2) -> Option<Rect> {
        self.engine.drag_to(&mut self.state, pointer)
    }

    pub fn drag_overlaps(&self) -> Vec<WidgetId> {
        self.engine.drag_overlaps(&self.state)
    }

    pub fn end_drag(&mut self, pointer: Vec2) -> Option<DropOutcome> {
        let outcome = self.engine.end_drag(&mut self.state, pointer);
        if outcome.is_some() {
            self.save();
        }
        outcome
    }

    pub fn begin_resize(&mut self, id: WidgetId, pointer: Vec2) -> bool {
        self.engine.begin_resize(&self.state, id, pointer)
    }

    pub fn resize_to(&mut self, pointer: Vec2) -> Option<Size> {
        self.engine.resize_to(&mut self.state, pointer)
    }

    pub fn end_resize(&mut self) -> bool {
        let ended = self.engine.end_resize();
        if ended {
            self.save();
        }
        ended
    }

    /// Viewport change from the window. Reflows (and saves) only when a
    /// breakpoint boundary is crossed.
    pub fn set_viewport(&mut self, viewport: Size) -> bool {
        let reflowed = self.engine.set_viewport(viewport, &mut self.state);
        if reflowed {
            self.save();
        }
        reflowed
    }

    // ── Backup ──

    /// Serialize the whole board as a timestamped JSON backup blob.
    pub fn export_backup(&self) -> Option<String> {
        let backup = Backup {
            state: state_to_stored(&self.state),
            saved_at: unix_now(),
        };
        match serde_json::to_string_pretty(&backup) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("Failed to serialize backup: {}", e);
                None
            }
        }
    }

    /// Restore a backup blob. Invalid input is rejected and the current
    /// state is left untouched. A restored board from a different viewport
    /// is reflowed to the current one.
    pub fn import_backup(&mut self, data: &str) -> bool {
        let backup: Backup = match serde_json::from_str(data) {
            Ok(b) => b,
            Err(_) => return false,
        };
        let mut state = match stored_to_state(&backup.state) {
            Some(s) => s,
            None => return false,
        };
        self.engine.sanitize(&mut state);
        let breakpoint = Breakpoint::from_width(self.engine.viewport().width);
        if state.breakpoint != breakpoint {
            state.breakpoint = breakpoint;
            self.engine.reflow(&mut state);
        }
        self.state = state;
        self.save();
        true
    }

    /// Drop everything and rebuild the default board.
    pub fn reset(&mut self) {
        self.state = default_state(&self.engine);
        self.save();
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::StoredState;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VIEWPORT: Size = Size {
        width: 1010.0,
        height: 800.0,
    };

    /// In-memory adapter going through the real serde types, plus a save
    /// counter for the save-on-every-mutation contract.
    struct MemStore {
        slots: RefCell<HashMap<String, String>>,
        saves: Rc<Cell<usize>>,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                slots: RefCell::new(HashMap::new()),
                saves: Rc::new(Cell::new(0)),
            }
        }
    }

    impl PersistenceAdapter for MemStore {
        fn load(&self, key: &str) -> Option<LayoutState> {
            let data = self.slots.borrow().get(key).cloned()?;
            let stored: StoredState = serde_json::from_str(&data).ok()?;
            stored_to_state(&stored)
        }

        fn save(&self, key: &str, state: &LayoutState) {
            self.saves.set(self.saves.get() + 1);
            let json = serde_json::to_string(&state_to_stored(state)).unwrap();
            self.slots.borrow_mut().insert(key.to_string(), json);
        }
    }

    fn open_store() -> LayoutStore<MemStore> {
        LayoutStore::open(MemStore::new(), PlacementConfig::default(), VIEWPORT)
    }

    fn temp_dir() -> std::path::PathBuf {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "tabdeck-test-{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ))
    }

    // ──────────────────────────────────────────
    // Defaults and load
    // ──────────────────────────────────────────

    #[test]
    fn test_open_without_data_builds_default_board() {
        let store = open_store();
        let titles: Vec<&str> = store.widgets().iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Notes", "Todo List", "Quick Links"]);
        // Three columns fit, so the defaults sit side by side in row 0.
        assert!(store.widgets().iter().all(|w| w.geometry.y == 20.0));
    }

    #[test]
    fn test_open_restores_persisted_state() {
        let adapter = MemStore::new();
        let expected = {
            let mut store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
            store.add_widget(WidgetKind::Rss);
            store.set_title(1, "Scratch");
            store.state().clone()
        };

        // Reopen over the same backing map.
        let adapter = MemStore::new();
        adapter.save(STORAGE_KEY, &expected);
        let store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
        assert_eq!(store.state(), &expected);
    }

    #[test]
    fn test_stored_round_trip() {
        let mut store = open_store();
        store.add_widget(WidgetKind::Rss);
        store.set_content(1, "{\"text\":\"hello\"}");
        let state = store.state().clone();

        let restored = stored_to_state(&state_to_stored(&state)).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_open_repairs_malformed_geometry() {
        let adapter = MemStore::new();
        let mut bad = {
            let store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
            store.state().clone()
        };
        bad.widgets[0].geometry.x = -500.0;
        bad.widgets[1].geometry.width = 0.0;

        let adapter = MemStore::new();
        adapter.save(STORAGE_KEY, &bad);
        let store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
        for w in store.widgets() {
            assert!(w.geometry.x >= 0.0 && w.geometry.width > 0.0);
        }
        // The repair is written back immediately, not on the next mutation.
        let reloaded = store.adapter().load(STORAGE_KEY).unwrap();
        assert_eq!(reloaded, *store.state());
    }

    #[test]
    fn test_open_reflows_stale_breakpoint() {
        let adapter = MemStore::new();
        let state = {
            let store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
            store.state().clone()
        };
        assert_eq!(state.breakpoint, Breakpoint::Md);

        let adapter = MemStore::new();
        adapter.save(STORAGE_KEY, &state);
        // Reopen at a sm-width viewport: two columns.
        let store = LayoutStore::open(adapter, PlacementConfig::default(), Size::new(700.0, 800.0));
        assert_eq!(store.state().breakpoint, Breakpoint::Sm);
        let third = &store.widgets()[2].geometry;
        assert_eq!((third.x, third.y), (20.0, 440.0));
        // The reflowed layout is written back immediately.
        let reloaded = store.adapter().load(STORAGE_KEY).unwrap();
        assert_eq!(reloaded, *store.state());
    }

    #[test]
    fn test_empty_widget_list_counts_as_corrupt() {
        let adapter = MemStore::new();
        adapter.slots.borrow_mut().insert(
            STORAGE_KEY.to_string(),
            "{\"widgets\":[],\"next_id\":1,\"max_z_index\":0,\"breakpoint\":\"lg\"}".to_string(),
        );
        let store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
        assert_eq!(store.widgets().len(), 3);
    }

    // ──────────────────────────────────────────
    // Mutations
    // ──────────────────────────────────────────

    #[test]
    fn test_add_widget_assigns_fresh_id_and_top_z() {
        let mut store = open_store();
        let before_z = store.max_z_index();
        let id = store.add_widget(WidgetKind::Rss);
        assert_eq!(id, 4); // after the three defaults
        let widget = store.widget(id).unwrap();
        assert_eq!(widget.title, "RSS Feeds");
        assert_eq!(widget.geometry.z_index, before_z + 1);
        assert_eq!(store.max_z_index(), before_z + 1);
        // Fourth widget wraps to row 2.
        assert_eq!((widget.geometry.x, widget.geometry.y), (20.0, 440.0));
    }

    #[test]
    fn test_remove_keeps_other_ids_stable() {
        let mut store = open_store();
        assert!(store.remove_widget(2));
        assert!(!store.remove_widget(2));
        let ids: Vec<WidgetId> = store.widgets().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 3]);
        // Freed ids are never reused.
        assert_eq!(store.add_widget(WidgetKind::Notes), 4);
    }

    #[test]
    fn test_update_geometry_applies_partial_patch() {
        let mut store = open_store();
        let before = store.widget(1).unwrap().geometry;
        store.update_geometry(
            1,
            GeometryPatch {
                y: Some(900.0),
                height: Some(250.0),
                ..GeometryPatch::default()
            },
        );
        let after = store.widget(1).unwrap().geometry;
        assert_eq!(after.x, before.x);
        assert_eq!(after.y, 900.0);
        assert_eq!(after.width, before.width);
        assert_eq!(after.height, 250.0);
    }

    #[test]
    fn test_bring_to_front_is_strictly_monotonic() {
        let mut store = open_store();
        let z0 = store.max_z_index();
        assert!(store.bring_to_front(1));
        assert_eq!(store.widget(1).unwrap().geometry.z_index, z0 + 1);
        assert_eq!(store.max_z_index(), z0 + 1);

        // Raising another widget keeps climbing, never ties.
        assert!(store.bring_to_front(2));
        assert_eq!(store.max_z_index(), z0 + 2);
        assert!(!store.bring_to_front(99));
    }

    #[test]
    fn test_every_mutation_saves() {
        let mut store = open_store();
        let saves = Rc::clone(&store.adapter().saves);
        let base = saves.get();

        store.add_widget(WidgetKind::Notes);
        assert_eq!(saves.get(), base + 1);
        store.set_title(1, "Renamed");
        assert_eq!(saves.get(), base + 2);
        store.bring_to_front(2);
        assert_eq!(saves.get(), base + 3);
        store.remove_widget(3);
        assert_eq!(saves.get(), base + 4);

        // Gestures save once, at the end.
        store.begin_drag(1, Vec2::new(30.0, 30.0));
        store.drag_to(Vec2::new(130.0, 30.0));
        assert_eq!(saves.get(), base + 4);
        store.end_drag(Vec2::new(130.0, 30.0));
        assert_eq!(saves.get(), base + 5);
    }

    #[test]
    fn test_drag_through_store_persists_drop() {
        let mut store = open_store();
        assert!(store.begin_drag(1, Vec2::new(30.0, 30.0)));
        store.drag_to(Vec2::new(130.0, 530.0));
        let outcome = store.end_drag(Vec2::new(130.0, 530.0));
        assert!(matches!(outcome, Some(DropOutcome::Committed { .. })));

        let reloaded = store.adapter().load(STORAGE_KEY).unwrap();
        assert_eq!(reloaded, *store.state());
    }

    #[test]
    fn test_resize_through_store() {
        let mut store = open_store();
        assert!(store.begin_resize(1, Vec2::new(330.0, 420.0)));
        store.resize_to(Vec2::new(330.0, 520.0));
        assert!(store.end_resize());
        assert_eq!(store.widget(1).unwrap().geometry.height, 500.0);
        assert!(!store.end_resize());
    }

    // ──────────────────────────────────────────
    // Backup and reset
    // ──────────────────────────────────────────

    #[test]
    fn test_backup_round_trip() {
        let mut store = open_store();
        store.add_widget(WidgetKind::Rss);
        store.set_title(1, "Scratch");
        let snapshot = store.state().clone();
        let blob = store.export_backup().unwrap();

        store.remove_widget(1);
        store.remove_widget(4);
        assert!(store.import_backup(&blob));
        assert_eq!(store.state(), &snapshot);
    }

    #[test]
    fn test_invalid_backup_is_rejected() {
        let mut store = open_store();
        let before = store.state().clone();
        assert!(!store.import_backup("not json"));
        assert!(!store.import_backup("{\"state\":{\"widgets\":[]},\"saved_at\":0}"));
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_reset_rebuilds_default_board() {
        let mut store = open_store();
        store.add_widget(WidgetKind::Rss);
        store.set_title(1, "Scratch");
        store.reset();
        let titles: Vec<&str> = store.widgets().iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Notes", "Todo List", "Quick Links"]);
    }

    // ──────────────────────────────────────────
    // File adapter
    // ──────────────────────────────────────────

    #[test]
    fn test_file_store_round_trip() {
        let dir = temp_dir();
        let adapter = FileStore::with_dir(dir.clone());
        let state = {
            let mut store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
            store.add_widget(WidgetKind::Todos);
            store.state().clone()
        };

        let adapter = FileStore::with_dir(dir.clone());
        assert_eq!(adapter.load(STORAGE_KEY), Some(state));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}.json", STORAGE_KEY)), "not json").unwrap();

        let adapter = FileStore::with_dir(dir.clone());
        assert_eq!(adapter.load(STORAGE_KEY), None);
        // Opening over the corrupt file falls back to the defaults.
        let store = LayoutStore::open(adapter, PlacementConfig::default(), VIEWPORT);
        assert_eq!(store.widgets().len(), 3);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let adapter = FileStore::with_dir(temp_dir());
        assert_eq!(adapter.load(STORAGE_KEY), None);
    }
}
