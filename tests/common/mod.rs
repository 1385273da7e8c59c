//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use vecstore::{StoreOptions, VectorDimension, VectorStore};

/// A temporary directory holding one store file.
pub struct TestStore {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("vectors.omen");
        Self { dir, path }
    }

    pub fn open(&self, capacity: usize) -> VectorStore {
        VectorStore::open(&self.path, capacity).expect("open store")
    }

    pub fn open_dim(&self, capacity: usize, dim: usize) -> VectorStore {
        let options = StoreOptions::new().with_dimension(VectorDimension::new(dim).unwrap());
        VectorStore::open_with(&self.path, capacity, &options).expect("open store")
    }
}

/// Deterministic vector whose components identify its slot.
pub fn pattern(seed: usize, dim: usize) -> Vec<f32> {
    (0..dim).map(|i| seed as f32 * 1000.0 + i as f32).collect()
}
