//! File-based storage: one `.pubd` file per document id.

use super::{encode, Storage, StorageError, StorageResult, DOCUMENT_EXTENSION};
use crate::document::Document;
use crate::serializer;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores documents as `.pubd` files in a directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/publisher/documents/`
    /// On Windows: `%LOCALAPPDATA%\publisher\documents\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("publisher").join("documents"))
    }

    /// Get the file path for a document ID.
    fn document_path(&self, id: &str) -> PathBuf {
        // Sanitize ID to be safe for filenames
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{safe_id}.{DOCUMENT_EXTENSION}"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, document: &Document) -> StorageResult<()> {
        let path = self.document_path(id);
        let text = encode(document)?;
        fs::write(&path, text)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved document {id} to {}", path.display());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Document> {
        let path = self.document_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serializer::deserialize(&text).map_err(|e| {
            log::warn!("Failed to load document {id}: {e}");
            StorageError::from(e)
        })
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.document_path(id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
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
            if path.extension().is_some_and(|e| e == DOCUMENT_EXTENSION) {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.document_path(id).exists())
    }
}
