//! In-memory storage implementation.

use super::{encode, Storage, StorageError, StorageResult};
use crate::document::Document;
use crate::serializer;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
///
/// Holds serialized text, so loads are validated like file loads.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw text under `id` without validation.
    pub fn insert_raw(&self, id: &str, text: impl Into<String>) -> StorageResult<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        docs.insert(id.to_string(), text.into());
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &Document) -> StorageResult<()> {
        let text = encode(document)?;
        self.insert_raw(id, text)?;
        log::info!("Saved document {id} to memory");
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Document> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        let text = docs
            .get(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        serializer::deserialize(text).map_err(|e| {
            log::warn!("Failed to load document {id}: {e}");
            StorageError::from(e)
        })
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        docs.remove(id);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        let mut ids: Vec<String> = docs.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(docs.contains_key(id))
    }
}
