use std::sync::Arc;

use parking_lot::RwLock;

use super::stats::StorageStats;
use super::store::VectorStore;
use super::types::Relocation;
use crate::error::StorageResult;

/// Thread-safe wrapper for [`VectorStore`].
///
/// Reads take a shared lock and return copies, since a zero-copy view
/// cannot outlive the guard. Writes, resize and flush take the exclusive
/// lock. Use [`with_store`](Self::with_store) for zero-copy access while the
/// lock is held.
#[derive(Debug, Clone)]
pub struct ConcurrentVectorStore {
    inner: Arc<RwLock<VectorStore>>,
}

impl ConcurrentVectorStore {
    pub fn new(store: VectorStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    #[must_use]
    pub fn read_vector(&self, index: usize) -> Option<Vec<f32>> {
        self.inner.read().read_vector(index)
    }

    #[must_use]
    pub fn read_batch(&self, start: usize, count: usize) -> Option<Vec<f32>> {
        self.inner.read().read_batch(start, count)
    }

    pub fn set_vector(&self, index: usize, data: &[f32]) -> StorageResult<()> {
        self.inner.write().set_vector(index, data)
    }

    pub fn set_batch(&self, start: usize, data: &[f32], dim: usize) -> StorageResult<()> {
        self.inner.write().set_batch(start, data, dim)
    }

    pub fn resize(&self, new_capacity: usize) -> StorageResult<Relocation> {
        self.inner.write().resize(new_capacity)
    }

    pub fn flush(&self) -> StorageResult<()> {
        self.inner.read().flush()
    }

    pub fn count(&self) -> usize {
        self.inner.read().count()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    pub fn stats(&self) -> StorageStats {
        self.inner.read().stats()
    }

    /// Runs `f` with shared access to the underlying store.
    pub fn with_store<R>(&self, f: impl FnOnce(&VectorStore) -> R) -> R {
        f(&self.inner.read())
    }

    /// Recovers the store if this is the last handle.
    pub fn into_inner(self) -> Result<VectorStore, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}
