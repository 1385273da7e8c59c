//! Memory-mapped storage for fixed-dimension vectors.
//!
//! A store is a single file holding a header, a flat array of equal-length
//! `f32` vectors and a parallel array of fixed-size metadata slots. The file
//! is mapped shared and read/write, so vectors are read and written in
//! place without serialization.
//!
//! # Storage Format
//! - Header (40 bytes): magic, version, capacity, count, dimension,
//!   metadata offset, native byte order
//! - Vectors: `capacity * dimension` row-major `f32`
//! - Metadata: `capacity * 256` bytes, one slot per vector
//!
//! # Invalidation
//! Views returned by the store borrow it. `resize` takes `&mut self` and may
//! move the mapping, so the compiler rejects any view held across it.
//!
//! This layer does no indexing, ranking or similarity search.

mod concurrent;
mod header;
mod layout;
mod region;
mod stats;
mod store;
mod types;

pub use concurrent::ConcurrentVectorStore;
pub use header::{FORMAT_VERSION, HEADER_SIZE, MAGIC, StoreHeader};
pub use layout::{METADATA_STRIDE, SlotLayout};
pub use stats::StorageStats;
pub use store::{METADATA_PAYLOAD_MAX, StoreOptions, VectorStore};
pub use types::{DEFAULT_DIMENSION, DEFAULT_INITIAL_CAPACITY, Relocation, VectorDimension};
