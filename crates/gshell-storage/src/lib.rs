//! Persistent window geometry and display state for the shell window.
//!
//! Backed by SQLite at `<data_dir>/<organization>/<application>/settings.db`
//! with a single key-value `settings` table. The record is written once,
//! from the close handler, and read once at startup.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Settings key for the final display state ("normal" | "maximized" | "fullscreen").
pub const KEY_STATE: &str = "app.state";
/// Settings key for the last normal-state window size ("width,height").
pub const KEY_SIZE: &str = "app.size";
/// Settings key for the last normal-state window position ("x,y").
pub const KEY_POS: &str = "app.pos";

/// Custom error type for settings-store operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Window size in integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Default for Size {
    /// The fixed first-run window size.
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Window top-left position in integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Window chrome state, persisted with precedence Maximized > Fullscreen > Normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Normal,
    Maximized,
    Fullscreen,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Normal => "normal",
            DisplayMode::Maximized => "maximized",
            DisplayMode::Fullscreen => "fullscreen",
        }
    }

    /// Unknown or empty values map to Normal.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "maximized" => DisplayMode::Maximized,
            "fullscreen" => DisplayMode::Fullscreen,
            _ => DisplayMode::Normal,
        }
    }
}

/// The persisted window record.
///
/// `position` is absent until the window has been closed at least once in
/// normal state; an absent position means "center on the primary display".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub size: Size,
    pub position: Option<Position>,
    pub display_mode: DisplayMode,
}

/// Live window state sampled by the close handler.
#[derive(Debug, Clone, Copy)]
pub struct WindowSnapshot {
    pub size: Size,
    pub position: Position,
    pub is_maximized: bool,
    pub is_minimized: bool,
    pub is_fullscreen: bool,
}

/// Compute the record to persist at close time.
///
/// Geometry of a maximized or minimized window is meaningless and must not
/// overwrite the last good normal-state geometry; the display mode always
/// reflects the final state.
pub fn record_for_close(
    previous: Option<&WindowRecord>,
    snapshot: &WindowSnapshot,
) -> WindowRecord {
    let display_mode = if snapshot.is_maximized {
        DisplayMode::Maximized
    } else if snapshot.is_fullscreen {
        DisplayMode::Fullscreen
    } else {
        DisplayMode::Normal
    };

    let geometry_usable = !snapshot.is_maximized && !snapshot.is_minimized;
    let (size, position) = if geometry_usable {
        (snapshot.size, Some(snapshot.position))
    } else if let Some(prev) = previous {
        (prev.size, prev.position)
    } else {
        (Size::default(), None)
    };

    WindowRecord {
        size,
        position,
        display_mode,
    }
}

/// SQLite-backed settings store scoped to organization + application identity.
pub struct SettingsStore {
    db_path: PathBuf,
    conn: Connection,
}

impl SettingsStore {
    /// Open (creating if necessary) the store for the given identity.
    pub fn open(organization: &str, application: &str) -> Result<Self, StorageError> {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(organization)
            .join(application);
        std::fs::create_dir_all(&dir)?;
        Self::open_at(dir.join("settings.db"))
    }

    /// Open a store at an explicit database path.
    pub fn open_at(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
            [],
        )?;

        debug!(path = %db_path.display(), "settings store opened");
        Ok(Self { db_path, conn })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get a raw value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let result: Result<String, rusqlite::Error> =
            self.conn
                .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                    row.get(0)
                });

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    /// Set a raw value by key, overwriting any previous value.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key if present.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(())
    }

    /// Load the persisted window record.
    ///
    /// Returns `None` exactly on first run (no record ever written). A
    /// corrupt or unreadable store is treated the same as absent so the
    /// shell falls back to first-run defaults instead of failing.
    pub fn load_window(&self) -> Option<WindowRecord> {
        let size_raw = match self.get(KEY_SIZE) {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read {}: {}", KEY_SIZE, e);
                return None;
            }
        };

        let size = match parse_pair(&size_raw) {
            Some((w, h)) if w > 0 && h > 0 => Size {
                width: w as u32,
                height: h as u32,
            },
            _ => {
                warn!("corrupt {} value {:?}, using first-run defaults", KEY_SIZE, size_raw);
                return None;
            }
        };

        let position = self
            .get(KEY_POS)
            .ok()
            .flatten()
            .and_then(|v| parse_pair(&v))
            .map(|(x, y)| Position { x, y });

        let display_mode = self
            .get(KEY_STATE)
            .ok()
            .flatten()
            .map(|v| DisplayMode::from_stored(&v))
            .unwrap_or_default();

        Some(WindowRecord {
            size,
            position,
            display_mode,
        })
    }

    /// Persist the window record, overwriting the previous one.
    pub fn save_window(&self, record: &WindowRecord) -> Result<(), StorageError> {
        self.set(
            KEY_SIZE,
            &format!("{},{}", record.size.width, record.size.height),
        )?;
        match record.position {
            Some(pos) => self.set(KEY_POS, &format!("{},{}", pos.x, pos.y))?,
            None => self.remove(KEY_POS)?,
        }
        self.set(KEY_STATE, record.display_mode.as_str())?;
        debug!(?record, "window record saved");
        Ok(())
    }
}

fn parse_pair(value: &str) -> Option<(i32, i32)> {
    let (a, b) = value.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open_at(dir.path().join("settings.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_first_run_is_absent() {
        let (_dir, store) = temp_store();
        assert!(store.load_window().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, store) = temp_store();
        let record = WindowRecord {
            size: Size {
                width: 1024,
                height: 768,
            },
            position: Some(Position { x: 40, y: 60 }),
            display_mode: DisplayMode::Fullscreen,
        };
        store.save_window(&record).unwrap();
        assert_eq!(store.load_window(), Some(record));
    }

    #[test]
    fn test_save_without_position() {
        let (_dir, store) = temp_store();
        let record = WindowRecord {
            size: Size::default(),
            position: None,
            display_mode: DisplayMode::Maximized,
        };
        store.save_window(&record).unwrap();
        let loaded = store.load_window().unwrap();
        assert_eq!(loaded.position, None);
        assert_eq!(loaded.display_mode, DisplayMode::Maximized);
    }

    #[test]
    fn test_overwrite_replaces_record() {
        let (_dir, store) = temp_store();
        let first = WindowRecord {
            size: Size {
                width: 800,
                height: 600,
            },
            position: Some(Position { x: 0, y: 0 }),
            display_mode: DisplayMode::Normal,
        };
        store.save_window(&first).unwrap();

        let second = WindowRecord {
            size: Size {
                width: 1600,
                height: 900,
            },
            position: Some(Position { x: 100, y: 50 }),
            display_mode: DisplayMode::Normal,
        };
        store.save_window(&second).unwrap();
        assert_eq!(store.load_window(), Some(second));
    }

    #[test]
    fn test_corrupt_size_treated_as_absent() {
        let (_dir, store) = temp_store();
        store.set(KEY_SIZE, "not-a-size").unwrap();
        store.set(KEY_STATE, "normal").unwrap();
        assert!(store.load_window().is_none());
    }

    #[test]
    fn test_unknown_state_maps_to_normal() {
        let (_dir, store) = temp_store();
        store.set(KEY_SIZE, "640,480").unwrap();
        store.set(KEY_STATE, "sideways").unwrap();
        let loaded = store.load_window().unwrap();
        assert_eq!(loaded.display_mode, DisplayMode::Normal);
    }

    #[test]
    fn test_close_in_normal_state_samples_geometry() {
        let snapshot = WindowSnapshot {
            size: Size {
                width: 900,
                height: 700,
            },
            position: Position { x: 10, y: 20 },
            is_maximized: false,
            is_minimized: false,
            is_fullscreen: false,
        };
        let record = record_for_close(None, &snapshot);
        assert_eq!(record.size.width, 900);
        assert_eq!(record.position, Some(Position { x: 10, y: 20 }));
        assert_eq!(record.display_mode, DisplayMode::Normal);
    }

    #[test]
    fn test_close_while_maximized_keeps_previous_geometry() {
        let previous = WindowRecord {
            size: Size {
                width: 1000,
                height: 650,
            },
            position: Some(Position { x: 33, y: 44 }),
            display_mode: DisplayMode::Normal,
        };
        // A maximized window reports screen-sized geometry; it must not win.
        let snapshot = WindowSnapshot {
            size: Size {
                width: 2560,
                height: 1440,
            },
            position: Position { x: 0, y: 0 },
            is_maximized: true,
            is_minimized: false,
            is_fullscreen: false,
        };
        let record = record_for_close(Some(&previous), &snapshot);
        assert_eq!(record.display_mode, DisplayMode::Maximized);
        assert_eq!(record.size, previous.size);
        assert_eq!(record.position, previous.position);
    }

    #[test]
    fn test_close_while_maximized_without_previous_uses_defaults() {
        let snapshot = WindowSnapshot {
            size: Size {
                width: 2560,
                height: 1440,
            },
            position: Position { x: 0, y: 0 },
            is_maximized: true,
            is_minimized: false,
            is_fullscreen: false,
        };
        let record = record_for_close(None, &snapshot);
        assert_eq!(record.size, Size::default());
        assert_eq!(record.position, None);
    }

    #[test]
    fn test_maximized_takes_precedence_over_fullscreen() {
        let snapshot = WindowSnapshot {
            size: Size::default(),
            position: Position { x: 0, y: 0 },
            is_maximized: true,
            is_minimized: false,
            is_fullscreen: true,
        };
        let record = record_for_close(None, &snapshot);
        assert_eq!(record.display_mode, DisplayMode::Maximized);
    }

    #[test]
    fn test_fullscreen_close_persists_fullscreen() {
        let snapshot = WindowSnapshot {
            size: Size {
                width: 1920,
                height: 1080,
            },
            position: Position { x: 0, y: 0 },
            is_maximized: false,
            is_minimized: false,
            is_fullscreen: true,
        };
        let record = record_for_close(None, &snapshot);
        assert_eq!(record.display_mode, DisplayMode::Fullscreen);
    }
}
