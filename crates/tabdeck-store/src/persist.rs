// Layout persistence: save/restore the widget board across reloads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tabdeck_core::{
    Breakpoint, LayoutState, PersistenceAdapter, Widget, WidgetGeometry, WidgetKind,
};

/// Versioned storage key. Bump the suffix whenever the serialized shape
/// changes so old records are ignored instead of misparsed; there is no
/// migration, absent data falls back to the default board.
pub const STORAGE_KEY: &str = "tabdeck-data-v2";

// ──────────────────────────────────────────────
// Serializable layout types
// ──────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub(crate) struct StoredState {
    pub widgets: Vec<StoredWidget>,
    pub next_id: u64,
    pub max_z_index: u32,
    pub breakpoint: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct StoredWidget {
    pub id: u64,
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub z_index: u32,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct Backup {
    pub state: StoredState,
    /// Unix seconds at export time.
    pub saved_at: u64,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ──────────────────────────────────────────────
// Conversions
// ──────────────────────────────────────────────

fn kind_to_str(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Notes => "notes",
        WidgetKind::Links => "links",
        WidgetKind::Todos => "todos",
        WidgetKind::Rss => "rss",
    }
}

fn kind_from_str(s: &str) -> Option<WidgetKind> {
    match s {
        "notes" => Some(WidgetKind::Notes),
        "links" => Some(WidgetKind::Links),
        "todos" => Some(WidgetKind::Todos),
        "rss" => Some(WidgetKind::Rss),
        _ => None,
    }
}

fn breakpoint_to_str(breakpoint: Breakpoint) -> &'static str {
    match breakpoint {
        Breakpoint::Lg => "lg",
        Breakpoint::Md => "md",
        Breakpoint::Sm => "sm",
        Breakpoint::Xs => "xs",
        Breakpoint::Xxs => "xxs",
    }
}

fn breakpoint_from_str(s: &str) -> Option<Breakpoint> {
    match s {
        "lg" => Some(Breakpoint::Lg),
        "md" => Some(Breakpoint::Md),
        "sm" => Some(Breakpoint::Sm),
        "xs" => Some(Breakpoint::Xs),
        "xxs" => Some(Breakpoint::Xxs),
        _ => None,
    }
}

pub(crate) fn state_to_stored(state: &LayoutState) -> StoredState {
    StoredState {
        widgets: state
            .widgets
            .iter()
            .map(|w| StoredWidget {
                id: w.id,
                kind: kind_to_str(w.kind).to_string(),
                title: w.title.clone(),
                content: w.content.clone(),
                x: w.geometry.x,
                y: w.geometry.y,
                width: w.geometry.width,
                height: w.geometry.height,
                z_index: w.geometry.z_index,
            })
            .collect(),
        next_id: state.next_id,
        max_z_index: state.max_z_index,
        breakpoint: breakpoint_to_str(state.breakpoint).to_string(),
    }
}

/// Rebuild live state from a stored record. An empty widget list or an
/// unrecognized tag counts as unusable, the same as unparseable JSON; the
/// caller falls back to the default board. Geometry is not validated here —
/// the engine's sanitize pass repairs it after restore.
pub(crate) fn stored_to_state(stored: &StoredState) -> Option<LayoutState> {
    if stored.widgets.is_empty() {
        return None;
    }
    let breakpoint = breakpoint_from_str(&stored.breakpoint)?;
    let mut widgets = Vec::with_capacity(stored.widgets.len());
    for w in &stored.widgets {
        let kind = kind_from_str(&w.kind)?;
        widgets.push(Widget {
            id: w.id,
            kind,
            title: w.title.clone(),
            content: w.content.clone(),
            geometry: WidgetGeometry {
                x: w.x,
                y: w.y,
                width: w.width,
                height: w.height,
                z_index: w.z_index,
            },
        });
    }
    Some(LayoutState {
        widgets,
        next_id: stored.next_id,
        max_z_index: stored.max_z_index,
        breakpoint,
    })
}

// ──────────────────────────────────────────────
// File-backed adapter
// ──────────────────────────────────────────────

/// Stores one JSON file per key under the user's config directory.
pub struct FileStore {
    dir: Option<PathBuf>,
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            dir: dirs::config_dir().map(|d| d.join("tabdeck")),
        }
    }

    /// Use an explicit directory instead of the config dir.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{}.json", key)))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceAdapter for FileStore {
    fn load(&self, key: &str) -> Option<LayoutState> {
        let path = self.path_for(key)?;
        let data = std::fs::read_to_string(&path).ok()?;
        let stored: StoredState = serde_json::from_str(&data).ok()?;
        stored_to_state(&stored)
    }

    fn save(&self, key: &str, state: &LayoutState) {
        let path = match self.path_for(key) {
            Some(p) => p,
            None => {
                log::warn!("Could not determine config directory for layout save");
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create layout directory: {}", e);
                return;
            }
        }

        match serde_json::to_string_pretty(&state_to_stored(state)) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::error!("Failed to write layout file: {}", e);
                }
            }
            Err(e) => {
                log::error!("Failed to serialize layout: {}", e);
            }
        }
    }
}
