//! On-disk header stored in the first bytes of every store file.
//!
//! The header persists the logical state of a store (capacity, count,
//! dimension and metadata offset) so that reopening a file recovers it
//! without any log replay. All fields are fixed-width and stored in native
//! byte order:
//!
//! ```text
//! offset  field            width
//! 0       magic            4      'OMEN' sentinel
//! 4       version          4      format version (1)
//! 8       capacity         8      reserved vector slots
//! 16      count            8      highest written index + 1
//! 24      dimension        8      fixed vector length
//! 32      metadata_offset  8      byte offset of the metadata region
//! 40      <vector region>
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use super::layout::{METADATA_STRIDE, SlotLayout};
use crate::error::{StorageError, StorageResult};

/// Sentinel identifying an initialized store ('OMEN').
pub const MAGIC: u32 = 0x4F4D_454E;

/// Current header format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<StoreHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct StoreHeader {
    pub magic: u32,
    pub version: u32,
    pub capacity: u64,
    pub count: u64,
    pub dimension: u64,
    pub metadata_offset: u64,
}

impl StoreHeader {
    /// Builds a header describing `layout` with `count` written slots.
    #[must_use]
    pub fn new(layout: &SlotLayout, count: usize) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            capacity: layout.capacity() as u64,
            count: count as u64,
            dimension: layout.dimension().get() as u64,
            metadata_offset: layout.metadata_offset() as u64,
        }
    }

    /// Decodes a header from the start of `bytes`.
    ///
    /// Returns `None` if the buffer is too short or the magic is absent,
    /// which callers treat as a freshly created file.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        let header: Self = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
        (header.magic == MAGIC).then_some(header)
    }

    /// Raw bytes of the header, ready to copy into the mapped region.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Reads the header of an existing file without mapping it.
    pub fn read_from(file: &File, path: &Path) -> StorageResult<Option<Self>> {
        let len = file
            .metadata()
            .map_err(|source| StorageError::io(path, "stat", source))?
            .len();
        if len < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let mut buf = [0u8; HEADER_SIZE];
        let mut reader = file;
        reader
            .seek(SeekFrom::Start(0))
            .and_then(|_| reader.read_exact(&mut buf))
            .map_err(|source| StorageError::io(path, "read header", source))?;

        Ok(Self::decode(&buf))
    }

    /// Checks that a recovered header describes a usable store.
    pub fn validate(&self, path: &Path) -> StorageResult<()> {
        let invalid = |reason: String| StorageError::InvalidFormat {
            path: path.to_path_buf(),
            reason,
        };

        if self.version != FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }
        if self.dimension == 0 {
            return Err(invalid("stored dimension is zero".to_string()));
        }
        if self.count > self.capacity {
            return Err(invalid(format!(
                "stored count {} exceeds capacity {}",
                self.count, self.capacity
            )));
        }

        let capacity = usize::try_from(self.capacity)
            .map_err(|_| invalid(format!("capacity {} not addressable", self.capacity)))?;
        let dimension = usize::try_from(self.dimension)
            .map_err(|_| invalid(format!("dimension {} not addressable", self.dimension)))?;
        let expected = HEADER_SIZE
            .checked_add(capacity.saturating_mul(dimension).saturating_mul(4))
            .unwrap_or(usize::MAX);
        if self.metadata_offset != expected as u64 {
            return Err(invalid(format!(
                "metadata offset {} does not follow the vector region (expected {expected}, stride {METADATA_STRIDE})",
                self.metadata_offset
            )));
        }

        Ok(())
    }
}
