//! File-based storage.

use super::{Storage, StorageError, StorageResult};
use crate::document::CanvasState;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores boards as JSON files in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| StorageError::Io(format!("Failed to create storage directory: {}", e)))?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/inkflow/boards/`
    /// On Windows: `%LOCALAPPDATA%\inkflow\boards\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("inkflow").join("boards"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn board_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, state: &CanvasState) -> StorageResult<()> {
        let path = self.board_path(id);
        let json = state
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        // Write then rename; readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn load(&self, id: &str) -> StorageResult<CanvasState> {
        let path = self.board_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        CanvasState::from_json(&json)
            .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.board_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| StorageError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
        }
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.board_path(id).exists())
    }
}
