//! Error types for the vector storage engine
//!
//! This module provides structured error types using thiserror. Every
//! variant belongs to one of the engine's error categories (see
//! [`ErrorKind`]) and carries enough context to act on.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Broad error categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File open, create, truncate, read or flush failure.
    Io,
    /// Mapping or remapping failure, or a failed side allocation.
    Memory,
    /// Out-of-bounds index, dimension mismatch or malformed range.
    InvalidArgument,
    /// The file carries a header this engine cannot use.
    Format,
    /// Mutation attempted through a read-only handle.
    ReadOnly,
    /// Invalid configuration values.
    Config,
}

/// Main error type for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error(
        "I/O error during {operation} on '{path}': {source}\nSuggestion: Check disk space and file permissions"
    )]
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },

    #[error("Failed to memory-map {len} bytes of '{path}': {source}")]
    Map {
        path: PathBuf,
        len: usize,
        source: io::Error,
    },

    #[error(
        "Failed to remap '{path}' from {old_len} to {new_len} bytes: {source}\nSuggestion: Discard this handle and reopen the store"
    )]
    Remap {
        path: PathBuf,
        old_len: usize,
        new_len: usize,
        source: io::Error,
    },

    #[error("Index {index} out of bounds (capacity {capacity})")]
    IndexOutOfBounds { index: usize, capacity: usize },

    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Batch of {count} vectors at {start} exceeds capacity {capacity}")]
    InvalidRange {
        start: usize,
        count: usize,
        capacity: usize,
    },

    #[error("Batch of {len} values is not a whole number of {dimension}-dimensional vectors")]
    MalformedBatch { len: usize, dimension: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Capacity {capacity} at dimension {dimension} does not fit in the address space")]
    CapacityOverflow { capacity: usize, dimension: usize },

    #[error("Metadata payload of {len} bytes exceeds the per-slot limit of {max} bytes")]
    MetadataTooLarge { len: usize, max: usize },

    #[error(
        "Invalid storage format in '{path}': {reason}\nSuggestion: The file may be corrupted or written by an incompatible version"
    )]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Storage '{path}' is opened read-only")]
    ReadOnly { path: PathBuf },

    #[error("Allocation of {size} bytes aligned to {align} failed: {reason}")]
    Allocation {
        size: usize,
        align: usize,
        reason: &'static str,
    },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl StorageError {
    pub(crate) fn io(path: &Path, operation: &'static str, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }

    pub(crate) fn map(path: &Path, len: usize, source: io::Error) -> Self {
        Self::Map {
            path: path.to_path_buf(),
            len,
            source,
        }
    }

    pub(crate) fn remap(path: &Path, old_len: usize, new_len: usize, source: io::Error) -> Self {
        Self::Remap {
            path: path.to_path_buf(),
            old_len,
            new_len,
            source,
        }
    }

    /// Category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Map { .. } | Self::Remap { .. } | Self::Allocation { .. } => ErrorKind::Memory,
            Self::IndexOutOfBounds { .. }
            | Self::DimensionMismatch { .. }
            | Self::InvalidRange { .. }
            | Self::MalformedBatch { .. }
            | Self::InvalidDimension { .. }
            | Self::CapacityOverflow { .. }
            | Self::MetadataTooLarge { .. } => ErrorKind::InvalidArgument,
            Self::InvalidFormat { .. } => ErrorKind::Format,
            Self::ReadOnly { .. } => ErrorKind::ReadOnly,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Map { .. } => "MAP_FAILED",
            Self::Remap { .. } => "REMAP_FAILED",
            Self::IndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::MalformedBatch { .. } => "MALFORMED_BATCH",
            Self::InvalidDimension { .. } => "INVALID_DIMENSION",
            Self::CapacityOverflow { .. } => "CAPACITY_OVERFLOW",
            Self::MetadataTooLarge { .. } => "METADATA_TOO_LARGE",
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::ReadOnly { .. } => "READ_ONLY",
            Self::Allocation { .. } => "ALLOCATION_FAILED",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// Whether the handle that produced this error must be discarded.
    ///
    /// A failed remap leaves the mapping in an unspecified state. Every other
    /// error is reported before any byte is touched and can be retried with
    /// corrected input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Remap { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
