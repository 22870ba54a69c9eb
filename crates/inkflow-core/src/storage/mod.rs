//! Storage abstraction for board persistence.

mod file;
mod memory;
mod persistence;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use persistence::Persistence;

use crate::document::CanvasState;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for board storage backends.
///
/// Boards are stored as [`CanvasState`] keyed by board id.
pub trait Storage: Send + Sync {
    fn save(&self, id: &str, state: &CanvasState) -> StorageResult<()>;

    fn load(&self, id: &str) -> StorageResult<CanvasState>;

    /// Delete a board. Deleting a missing board is not an error.
    fn delete(&self, id: &str) -> StorageResult<()>;

    /// List all board ids.
    fn list(&self) -> StorageResult<Vec<String>>;

    fn exists(&self, id: &str) -> StorageResult<bool>;
}
