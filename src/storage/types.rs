//! Small value types shared by the storage engine.

use crate::error::{StorageError, StorageResult};

/// Dimension assumed for files created without an explicit choice.
pub const DEFAULT_DIMENSION: usize = 128;

/// Slots reserved for a new store when the caller does not choose.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Type-safe wrapper for vector dimensions.
///
/// A store holds vectors of exactly one dimension, fixed when the file is
/// first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> StorageResult<Self> {
        if dim == 0 {
            return Err(StorageError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// The default 128-dimensional layout.
    #[must_use]
    pub const fn dimension_128() -> Self {
        Self(DEFAULT_DIMENSION)
    }

    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Byte length of one vector of this dimension.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.0 * std::mem::size_of::<f32>()
    }

    /// Validates that a caller-declared dimension matches this one.
    pub fn validate(&self, actual: usize) -> StorageResult<()> {
        if actual != self.0 {
            return Err(StorageError::DimensionMismatch {
                expected: self.0,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for VectorDimension {
    fn default() -> Self {
        Self::dimension_128()
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of growing or shrinking the mapped region.
///
/// The base address may change across a resize. Any pointer derived from
/// `old_base` is invalid once a `Relocation` has been returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub old_base: usize,
    pub new_base: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl Relocation {
    /// A resize that did nothing.
    #[must_use]
    pub const fn unchanged(base: usize, len: usize) -> Self {
        Self {
            old_base: base,
            new_base: base,
            old_len: len,
            new_len: len,
        }
    }

    /// Whether the region now lives at a different address.
    #[must_use]
    pub const fn moved(&self) -> bool {
        self.old_base != self.new_base
    }
}
