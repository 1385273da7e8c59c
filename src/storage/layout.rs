//! Byte layout of a store file.
//!
//! ```text
//! +-----------------------------+ 0
//! | header (40 bytes)           |
//! +-----------------------------+ HEADER_SIZE
//! | vectors                     |
//! | capacity * dimension * 4    |
//! +-----------------------------+ metadata_offset
//! | metadata                    |
//! | capacity * 256              |
//! +-----------------------------+ total_size
//! ```

use std::ops::Range;

use super::header::HEADER_SIZE;
use super::types::VectorDimension;
use crate::error::{StorageError, StorageResult};

/// Fixed per-slot metadata budget in bytes.
pub const METADATA_STRIDE: usize = 256;

/// Computed offsets for a given capacity and dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    capacity: usize,
    dimension: VectorDimension,
    metadata_offset: usize,
    total_size: usize,
}

impl SlotLayout {
    /// Computes the layout, rejecting capacities whose size overflows.
    pub fn new(capacity: usize, dimension: VectorDimension) -> StorageResult<Self> {
        let overflow = || StorageError::CapacityOverflow {
            capacity,
            dimension: dimension.get(),
        };

        let vectors_len = capacity
            .checked_mul(dimension.stride())
            .ok_or_else(overflow)?;
        let metadata_len = capacity.checked_mul(METADATA_STRIDE).ok_or_else(overflow)?;
        let metadata_offset = HEADER_SIZE.checked_add(vectors_len).ok_or_else(overflow)?;
        let total_size = metadata_offset
            .checked_add(metadata_len)
            .ok_or_else(overflow)?;

        Ok(Self {
            capacity,
            dimension,
            metadata_offset,
            total_size,
        })
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    #[must_use]
    pub const fn metadata_offset(&self) -> usize {
        self.metadata_offset
    }

    #[must_use]
    pub const fn total_size(&self) -> usize {
        self.total_size
    }

    /// Byte range of the whole metadata region.
    #[must_use]
    pub const fn metadata_region(&self) -> Range<usize> {
        self.metadata_offset..self.total_size
    }

    /// Byte range of `count` contiguous vectors starting at `start`.
    ///
    /// Returns `None` if the run does not fit within capacity.
    #[must_use]
    pub fn vectors(&self, start: usize, count: usize) -> Option<Range<usize>> {
        let end = start.checked_add(count)?;
        if end > self.capacity {
            return None;
        }
        let stride = self.dimension.stride();
        Some(HEADER_SIZE + start * stride..HEADER_SIZE + end * stride)
    }

    /// Byte range of the metadata slot paired with `index`.
    #[must_use]
    pub fn metadata(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.capacity {
            return None;
        }
        let offset = self.metadata_offset + index * METADATA_STRIDE;
        Some(offset..offset + METADATA_STRIDE)
    }
}
