//! Memory-mapped, fixed-dimension vector storage.
//!
//! The crate stores equal-length `f32` vectors in a single file, addressed by
//! slot index, with zero-copy access through the mapping. Indexing and
//! search live in higher layers.

pub mod allocator;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

// Explicit exports for better API clarity
pub use allocator::{AlignedBlock, AllocPool, AllocStrategy, AllocatorKind, SystemStrategy};
pub use config::{LoggingConfig, Settings, StorageConfig};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use storage::{
    ConcurrentVectorStore, Relocation, StorageStats, StoreOptions, VectorDimension, VectorStore,
};
