//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::dataset::Dataset;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    datasets: RwLock<HashMap<String, Dataset>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {e}"))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, dataset: &Dataset) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let dataset = dataset.clone();
        Box::pin(async move {
            let mut datasets = self.datasets.write().map_err(lock_error)?;
            datasets.insert(id, dataset);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Dataset>> {
        let id = id.to_string();
        Box::pin(async move {
            let datasets = self.datasets.read().map_err(lock_error)?;
            datasets
                .get(&id)
                .cloned()
                .ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut datasets = self.datasets.write().map_err(lock_error)?;
            datasets.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let datasets = self.datasets.read().map_err(lock_error)?;
            Ok(datasets.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let datasets = self.datasets.read().map_err(lock_error)?;
            Ok(datasets.contains_key(&id))
        })
    }
}
