//! Canvas artifact store — one JSON document per artifact on disk.
//!
//! Artifacts persist under `<data-dir>/artifacts/canvases/<canvas-id>.json`.
//! Ids are restricted to filename-safe characters so a client-supplied id can
//! never escape the store directory.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{MemoryError, Result};

/// File-per-artifact JSON store for canvases.
pub struct CanvasStore {
    dir: PathBuf,
}

impl CanvasStore {
    /// Create a store rooted at `<data_dir>/artifacts/canvases`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("artifacts").join("canvases");
        std::fs::create_dir_all(&dir).map_err(|e| MemoryError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    /// Save (or overwrite) a canvas document.
    pub fn save(&self, canvas_id: &str, document: &Value) -> Result<()> {
        let path = self.path_for(canvas_id)?;
        let data = serde_json::to_vec_pretty(document)?;
        std::fs::write(&path, data).map_err(|e| MemoryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(canvas_id, path = %path.display(), "canvas saved");
        Ok(())
    }

    /// Load a canvas document.
    pub fn get(&self, canvas_id: &str) -> Result<Option<Value>> {
        let path = self.path_for(canvas_id)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MemoryError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// List stored canvas ids.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| MemoryError::Io {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        })?;
        let mut ids: Vec<String> = entries
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(String::from)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Delete a canvas. Returns `true` when a file was removed.
    pub fn delete(&self, canvas_id: &str) -> Result<bool> {
        let path = self.path_for(canvas_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MemoryError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn path_for(&self, canvas_id: &str) -> Result<PathBuf> {
        let valid = !canvas_id.is_empty()
            && canvas_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(MemoryError::InvalidId(canvas_id.to_string()));
        }
        Ok(self.dir.join(format!("{canvas_id}.json")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
