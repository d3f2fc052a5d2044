//! Snapshot persistence.
//!
//! The whole scheduler state is one JSON document, loaded at startup and
//! rewritten after every mutation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{CoreError, Result};
use crate::state::Snapshot;

use super::data_dir;

/// Where snapshots live.
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;

    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot stored as a pretty-printed JSON file.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `snapshot.json` inside [`data_dir`].
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(data_dir()?.join("snapshot.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot_error(&self, message: impl ToString) -> CoreError {
        CoreError::Snapshot {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| self.snapshot_error(e))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::trace!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

/// In-memory store. Keeps the serialized JSON so loads go through the same
/// decoding path as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    json: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw JSON, e.g. an older snapshot.
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            json: Mutex::new(Some(json.into())),
            saves: Mutex::new(0),
        }
    }

    pub fn json(&self) -> Option<String> {
        self.json.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        match self.json() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        *self.json.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Snapshot>> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        (**self).save(snapshot)
    }
}
