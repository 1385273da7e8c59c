//! Ownership of the backing file and its memory mapping.
//!
//! `MappedRegion` hands out byte slices borrowed from `&self`/`&mut self`.
//! Growing or shrinking requires `&mut self`, so the borrow checker rejects
//! any slice held across a remap.
//!
//! On Linux the mapping is resized with `mremap(MREMAP_MAYMOVE)`. Other
//! platforms lack that primitive, so the old mapping is flushed, dropped and
//! the file mapped again. The mapping is file-backed and shared, so either
//! path preserves contents without copying.

use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut, MmapOptions};

use super::types::Relocation;
use crate::error::{StorageError, StorageResult};

#[derive(Debug)]
enum Mapping {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

#[derive(Debug)]
pub(crate) struct MappedRegion {
    file: File,
    path: PathBuf,
    map: Mapping,
}

impl MappedRegion {
    /// Maps the first `len` bytes of `file` shared and writable.
    pub fn writable(file: File, path: &Path, len: usize) -> StorageResult<Self> {
        // SAFETY: the mapping is owned by this region and never outlives the
        // file handle. Slices into it are bounded by `len` and borrow `self`,
        // so they cannot survive a remap or unmap. Concurrent modification by
        // another process is outside what this layer coordinates.
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }
            .map_err(|source| StorageError::map(path, len, source))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            map: Mapping::ReadWrite(map),
        })
    }

    /// Maps the first `len` bytes of `file` read-only.
    pub fn read_only(file: File, path: &Path, len: usize) -> StorageResult<Self> {
        // SAFETY: as for `writable`; no mutable access is ever handed out.
        let map = unsafe { MmapOptions::new().len(len).map(&file) }
            .map_err(|source| StorageError::map(path, len, source))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            map: Mapping::ReadOnly(map),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.map {
            Mapping::ReadWrite(map) => &map[..],
            Mapping::ReadOnly(map) => &map[..],
        }
    }

    pub fn bytes_mut(&mut self) -> StorageResult<&mut [u8]> {
        match &mut self.map {
            Mapping::ReadWrite(map) => Ok(&mut map[..]),
            Mapping::ReadOnly(_) => Err(StorageError::ReadOnly {
                path: self.path.clone(),
            }),
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.map, Mapping::ReadOnly(_))
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn base_addr(&self) -> usize {
        self.bytes().as_ptr() as usize
    }

    /// Synchronously writes dirty pages back to the file.
    ///
    /// A read-only mapping has nothing to write and always succeeds.
    pub fn flush(&self) -> StorageResult<()> {
        match &self.map {
            Mapping::ReadWrite(map) => map
                .flush()
                .map_err(|source| StorageError::io(&self.path, "flush", source)),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }

    /// Metadata of the open backing file, independent of its current path.
    pub fn file_metadata(&self) -> StorageResult<Metadata> {
        self.file
            .metadata()
            .map_err(|source| StorageError::io(&self.path, "stat", source))
    }

    /// Sets the backing file length.
    pub fn set_file_len(&self, len: usize) -> StorageResult<()> {
        self.file
            .set_len(len as u64)
            .map_err(|source| StorageError::io(&self.path, "resize file", source))
    }

    /// Resizes the mapping to `new_len` bytes, moving it if needed.
    ///
    /// When growing, the file must already be at least `new_len` bytes.
    /// When shrinking, the file should be truncated only after this returns.
    pub fn grow_or_relocate(&mut self, new_len: usize) -> StorageResult<Relocation> {
        let old_base = self.base_addr();
        let old_len = self.len();

        #[cfg(target_os = "linux")]
        {
            self.remap_in_place(old_len, new_len)?;
        }
        #[cfg(not(target_os = "linux"))]
        {
            self.remap_by_reopen(old_len, new_len)?;
        }

        Ok(Relocation {
            old_base,
            new_base: self.base_addr(),
            old_len,
            new_len,
        })
    }

    #[cfg(target_os = "linux")]
    fn remap_in_place(&mut self, old_len: usize, new_len: usize) -> StorageResult<()> {
        let Mapping::ReadWrite(map) = &mut self.map else {
            return Err(StorageError::ReadOnly {
                path: self.path.clone(),
            });
        };
        // SAFETY: `&mut self` guarantees no slice into the old mapping is
        // alive, so moving it cannot leave a dangling reference.
        unsafe { map.remap(new_len, memmap2::RemapOptions::new().may_move(true)) }
            .map_err(|source| StorageError::remap(&self.path, old_len, new_len, source))
    }

    /// Flushes the mapping and maps the file again at `new_len`.
    ///
    /// The only resize path on platforms without `mremap`.
    #[cfg_attr(target_os = "linux", allow(dead_code))]
    fn remap_by_reopen(&mut self, old_len: usize, new_len: usize) -> StorageResult<()> {
        let Mapping::ReadWrite(map) = &mut self.map else {
            return Err(StorageError::ReadOnly {
                path: self.path.clone(),
            });
        };
        map.flush()
            .map_err(|source| StorageError::io(&self.path, "flush before remap", source))?;
        // SAFETY: `&mut self` guarantees no slice into the old mapping is
        // alive; it is dropped when replaced below.
        let fresh = unsafe { MmapOptions::new().len(new_len).map_mut(&self.file) }
            .map_err(|source| StorageError::remap(&self.path, old_len, new_len, source))?;
        *map = fresh;
        Ok(())
    }
}
