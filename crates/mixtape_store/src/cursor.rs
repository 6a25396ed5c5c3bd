//! Durable storage for the sync cursor.

use crate::error::{StoreError, StoreResult};
use mixtape_protocol::Timestamp;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable storage for the last-synced timestamp.
///
/// The cursor is a single scalar, keyed apart from entity storage, absent
/// on first run. It is loaded once at process start and advanced only by
/// the orchestrator after a fully successful sync round.
///
/// # Invariants
///
/// - `set(None)` is a no-op: an empty candidate never replaces a stored
///   cursor, so the cursor cannot regress to "absent"
/// - `get` reflects the last successful `set(Some(..))`, surviving process
///   restarts for durable implementations
pub trait CursorStore: Send + Sync {
    /// Returns the last fully incorporated server timestamp, if any.
    fn get(&self) -> Option<Timestamp>;

    /// Stores a new cursor value. A `None` candidate is ignored.
    fn set(&self, cursor: Option<Timestamp>) -> StoreResult<()>;
}

/// An in-memory cursor store for tests and ephemeral embedders.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursor: Mutex<Option<Timestamp>>,
}

impl MemoryCursorStore {
    /// Creates a new store with no cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with a cursor.
    #[must_use]
    pub fn with_cursor(cursor: Timestamp) -> Self {
        Self {
            cursor: Mutex::new(Some(cursor)),
        }
    }
}

impl CursorStore for MemoryCursorStore {
    fn get(&self) -> Option<Timestamp> {
        *self.cursor.lock()
    }

    fn set(&self, cursor: Option<Timestamp>) -> StoreResult<()> {
        if let Some(value) = cursor {
            *self.cursor.lock() = Some(value);
        }
        Ok(())
    }
}

/// A file-backed cursor store.
///
/// The cursor is persisted as a decimal string in a single file, read once
/// at open and cached. Writes go through to the file so the cursor
/// survives process restarts.
#[derive(Debug)]
pub struct FileCursorStore {
    path: PathBuf,
    cached: Mutex<Option<Timestamp>>,
}

impl FileCursorStore {
    /// Opens a cursor store at the given path, loading any stored value.
    ///
    /// A missing or empty file means no cursor (first run).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or holds
    /// something other than a decimal timestamp.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let cached = Self::load(&path)?;
        Ok(Self {
            path,
            cached: Mutex::new(cached),
        })
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> StoreResult<Option<Timestamp>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        trimmed
            .parse::<Timestamp>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("cursor file holds {trimmed:?}")))
    }
}

impl CursorStore for FileCursorStore {
    fn get(&self) -> Option<Timestamp> {
        *self.cached.lock()
    }

    fn set(&self, cursor: Option<Timestamp>) -> StoreResult<()> {
        let Some(value) = cursor else {
            return Ok(());
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, value.to_string())?;
        *self.cached.lock() = Some(value);
        Ok(())
    }
}
