//! Storage abstraction for persistence.
//!
//! Every backend stores the serialized text and loads through
//! [`crate::serializer::deserialize`], so a corrupt payload is rejected
//! whole instead of producing a partial document.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::document::Document;
use crate::error::EditorError;
use crate::serializer;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File extension of persisted documents.
pub const DOCUMENT_EXTENSION: &str = "pubd";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    /// The payload was read but is not a valid document.
    #[error("Invalid document: {0}")]
    Document(#[from] EditorError),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for document storage backends.
pub trait Storage: Send + Sync {
    /// Save a document.
    fn save(&self, id: &str, document: &Document) -> StorageResult<()>;

    /// Load a document.
    fn load(&self, id: &str) -> StorageResult<Document>;

    /// Delete a document. Deleting a missing id is not an error.
    fn delete(&self, id: &str) -> StorageResult<()>;

    /// List all document IDs.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Check if a document exists.
    fn exists(&self, id: &str) -> StorageResult<bool>;
}

/// Serialize a document to text, mapping failures to [`StorageError::Serialization`].
pub(crate) fn encode(document: &Document) -> StorageResult<String> {
    serializer::serialize(document).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Read and validate a document file at an explicit path.
pub fn read_document(path: &Path) -> StorageResult<Document> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.display().to_string()));
    }
    let text = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serializer::deserialize(&text).map_err(|e| {
        log::warn!("Failed to load {}: {}", path.display(), e);
        StorageError::from(e)
    })
}

/// Write a document file at an explicit path.
pub fn write_document(path: &Path, document: &Document) -> StorageResult<()> {
    let text = encode(document)?;
    fs::write(path, text)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
    log::info!("Saved document to {}", path.display());
    Ok(())
}
