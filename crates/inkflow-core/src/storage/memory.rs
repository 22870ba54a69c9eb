//! In-memory storage implementation.

use super::{Storage, StorageError, StorageResult};
use crate::document::CanvasState;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<String, CanvasState>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, state: &CanvasState) -> StorageResult<()> {
        let mut boards = self.boards.write().map_err(lock_error)?;
        boards.insert(id.to_string(), state.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<CanvasState> {
        let boards = self.boards.read().map_err(lock_error)?;
        boards
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut boards = self.boards.write().map_err(lock_error)?;
        boards.remove(id);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let boards = self.boards.read().map_err(lock_error)?;
        Ok(boards.keys().cloned().collect())
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let boards = self.boards.read().map_err(lock_error)?;
        Ok(boards.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::ids::SequentialIds;
    use crate::shapes::{Shape, ShapeKind};
    use kurbo::Rect;

    fn board() -> CanvasState {
        let mut ids = SequentialIds::new();
        let mut state = CanvasState::new();
        state.add(Element::Shape(Shape::new(&mut ids, ShapeKind::Rectangle, Rect::new(0.0, 0.0, 10.0, 10.0))));
        state
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let state = board();

        storage.save("test", &state).unwrap();
        assert_eq!(storage.load("test").unwrap(), state);
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.load("nonexistent"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists("test").unwrap());
        storage.save("test", &board()).unwrap();
        assert!(storage.exists("test").unwrap());
        storage.delete("test").unwrap();
        assert!(!storage.exists("test").unwrap());
        storage.delete("test").unwrap();
    }

    #[test]
    fn test_list() {
        let storage = MemoryStorage::new();
        storage.save("doc1", &board()).unwrap();
        storage.save("doc2", &CanvasState::new()).unwrap();

        let list = storage.list().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"doc1".to_string()));
        assert!(list.contains(&"doc2".to_string()));
    }
}
