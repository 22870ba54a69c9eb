//! Fire-and-forget board saving.

use super::{Storage, StorageResult};
use crate::document::CanvasState;
use std::sync::Arc;

/// Saves one board on every change without surfacing failures.
#[derive(Clone)]
pub struct Persistence {
    storage: Arc<dyn Storage>,
    board_id: String,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").field("board_id", &self.board_id).finish_non_exhaustive()
    }
}

impl Persistence {
    pub fn new(storage: Arc<dyn Storage>, board_id: impl Into<String>) -> Self {
        Self {
            storage,
            board_id: board_id.into(),
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Save the board, logging failures. Returns whether the save succeeded.
    pub fn save_quietly(&self, state: &CanvasState) -> bool {
        match self.storage.save(&self.board_id, state) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save board {}: {}", self.board_id, e);
                false
            }
        }
    }

    /// Load the board, or `None` if it has never been saved.
    pub fn load(&self) -> StorageResult<Option<CanvasState>> {
        if !self.storage.exists(&self.board_id)? {
            return Ok(None);
        }
        self.storage.load(&self.board_id).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn save(&self, _id: &str, _state: &CanvasState) -> StorageResult<()> {
            Err(StorageError::Other("quota exceeded".into()))
        }
        fn load(&self, id: &str) -> StorageResult<CanvasState> {
            Err(StorageError::NotFound(id.into()))
        }
        fn delete(&self, _id: &str) -> StorageResult<()> {
            Ok(())
        }
        fn list(&self) -> StorageResult<Vec<String>> {
            Ok(vec![])
        }
        fn exists(&self, _id: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_save_quietly_swallows_failure() {
        let persistence = Persistence::new(Arc::new(FailingStorage), "board");
        assert!(!persistence.save_quietly(&CanvasState::new()));
    }

    #[test]
    fn test_load_missing_is_none() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = Persistence::new(storage.clone(), "board");
        assert!(persistence.load().unwrap().is_none());
        assert!(persistence.save_quietly(&CanvasState::new()));
        assert_eq!(persistence.load().unwrap(), Some(CanvasState::new()));
    }
}
