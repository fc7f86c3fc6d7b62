// Persistence for user-authored categories.
//
// The setup screen lists stored custom categories next to the built-in ones
// and writes new or edited ones back. Two stores implement `CategoryStore`:
// - `MemoryCategoryStore`: a plain `Vec`, for tests and throwaway sessions.
// - `JsonFileStore`: one pretty-printed JSON array on disk. A missing file
//   reads as an empty list. Writes go to a sibling temp file and are renamed
//   into place so a crash mid-write never truncates the list.
//
// Saving upserts by `id`; list order is insertion order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::CustomCategory;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("category store i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("category store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub trait CategoryStore {
    fn get_custom_categories(&self) -> Result<Vec<CustomCategory>, StorageError>;

    /// Insert `category`, replacing any stored category with the same id.
    fn save_custom_category(&mut self, category: CustomCategory) -> Result<(), StorageError>;

    /// Remove the category with `id`. Returns whether one was removed.
    fn delete_custom_category(&mut self, id: &str) -> Result<bool, StorageError>;
}

fn upsert(categories: &mut Vec<CustomCategory>, category: CustomCategory) {
    match categories.iter_mut().find(|c| c.id == category.id) {
        Some(existing) => *existing = category,
        None => categories.push(category),
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryCategoryStore {
    categories: Vec<CustomCategory>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CategoryStore for MemoryCategoryStore {
    fn get_custom_categories(&self) -> Result<Vec<CustomCategory>, StorageError> {
        Ok(self.categories.clone())
    }

    fn save_custom_category(&mut self, category: CustomCategory) -> Result<(), StorageError> {
        upsert(&mut self.categories, category);
        Ok(())
    }

    fn delete_custom_category(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        Ok(self.categories.len() != before)
    }
}

/// Categories stored as a JSON array in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, categories: &[CustomCategory]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(categories)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CategoryStore for JsonFileStore {
    fn get_custom_categories(&self) -> Result<Vec<CustomCategory>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_custom_category(&mut self, category: CustomCategory) -> Result<(), StorageError> {
        let mut categories = self.get_custom_categories()?;
        upsert(&mut categories, category);
        self.write_all(&categories)
    }

    fn delete_custom_category(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut categories = self.get_custom_categories()?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Ok(false);
        }
        self.write_all(&categories)?;
        Ok(true)
    }
}
