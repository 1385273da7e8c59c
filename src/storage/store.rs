//! The `VectorStore` handle.
//!
//! A store owns one backing file, its shared mapping and the on-disk header.
//! Vectors are addressed purely by slot index; views returned by
//! [`VectorStore::get_vector`] and [`VectorStore::get_batch`] point straight
//! into the mapping and borrow the handle, so they cannot be held across
//! [`VectorStore::resize`] or [`VectorStore::close`].

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::header::{HEADER_SIZE, StoreHeader};
use super::layout::{METADATA_STRIDE, SlotLayout};
use super::region::MappedRegion;
use super::stats::StorageStats;
use super::types::{DEFAULT_INITIAL_CAPACITY, Relocation, VectorDimension};
use crate::allocator::{AlignedBlock, AllocPool, AllocStrategy, SystemStrategy};
use crate::config::Settings;
use crate::error::{StorageError, StorageResult};

/// Bytes of each metadata slot reserved for the payload length prefix.
const METADATA_LEN_PREFIX: usize = std::mem::size_of::<u32>();

/// Largest metadata payload a single slot can hold.
pub const METADATA_PAYLOAD_MAX: usize = METADATA_STRIDE - METADATA_LEN_PREFIX;

/// Parameters applied when a store is opened.
///
/// The dimension and initial capacity only matter for newly created files;
/// an existing header always wins.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    dimension: VectorDimension,
    initial_capacity: usize,
    allocator: Arc<dyn AllocStrategy>,
    flush_on_drop: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            dimension: VectorDimension::dimension_128(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            allocator: Arc::new(SystemStrategy),
            flush_on_drop: true,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, dimension: VectorDimension) -> Self {
        self.dimension = dimension;
        self
    }

    /// Slots reserved by [`VectorStore::open_configured`] for a new file.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Selects the strategy behind [`VectorStore::alloc`].
    pub fn with_allocator(mut self, allocator: Arc<dyn AllocStrategy>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Whether dropping the handle without `close` should flush.
    pub fn with_flush_on_drop(mut self, flush_on_drop: bool) -> Self {
        self.flush_on_drop = flush_on_drop;
        self
    }

    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn flush_on_drop(&self) -> bool {
        self.flush_on_drop
    }
}

/// Memory-mapped storage for fixed-dimension vectors.
///
/// Not internally synchronized: callers serialize access themselves or use
/// [`ConcurrentVectorStore`](super::ConcurrentVectorStore).
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    canonical_path: PathBuf,
    region: MappedRegion,
    layout: SlotLayout,
    count: usize,
    pool: Arc<AllocPool>,
    flush_on_drop: bool,
}

impl VectorStore {
    /// Opens or creates a store with the default options (dimension 128).
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> StorageResult<Self> {
        Self::open_with(path, capacity, &StoreOptions::default())
    }

    /// Opens or creates a store sized and tuned by `settings`.
    ///
    /// A new file reserves `storage.initial_capacity` slots.
    pub fn open_configured(path: impl AsRef<Path>, settings: &Settings) -> StorageResult<Self> {
        let options = settings.store_options()?;
        Self::open_with(path, options.initial_capacity(), &options)
    }

    /// Opens or creates a store.
    ///
    /// A file that already carries a valid header is recovered as-is: its
    /// capacity, count and dimension override `capacity` and the options.
    /// Recovery never truncates the file.
    pub fn open_with(
        path: impl AsRef<Path>,
        capacity: usize,
        options: &StoreOptions,
    ) -> StorageResult<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| StorageError::io(path, "open", source))?;
        let file_len = file_len(&file, path)?;
        let canonical_path = canonicalize(path)?;

        let recovered = StoreHeader::read_from(&file, path)?;
        let (layout, count) = match recovered {
            Some(header) => {
                header.validate(path)?;
                let layout = layout_of(&header)?;
                if layout.capacity() != capacity {
                    warn!(
                        path = %path.display(),
                        requested = capacity,
                        stored = layout.capacity(),
                        "stored capacity overrides requested capacity"
                    );
                }
                if file_len < layout.total_size() as u64 {
                    file.set_len(layout.total_size() as u64)
                        .map_err(|source| StorageError::io(path, "extend file", source))?;
                }
                info!(
                    path = %path.display(),
                    capacity = layout.capacity(),
                    count = header.count,
                    dimension = header.dimension,
                    "recovered vector store"
                );
                (layout, header.count as usize)
            }
            None => {
                let layout = SlotLayout::new(capacity, options.dimension)?;
                if file_len > 0 {
                    // Not a store: discard whatever was there.
                    file.set_len(0)
                        .map_err(|source| StorageError::io(path, "reset file", source))?;
                }
                file.set_len(layout.total_size() as u64)
                    .map_err(|source| StorageError::io(path, "size file", source))?;
                debug!(
                    path = %path.display(),
                    capacity,
                    dimension = options.dimension.get(),
                    bytes = layout.total_size(),
                    "created vector store"
                );
                (layout, 0)
            }
        };

        let region = MappedRegion::writable(file, path, layout.total_size())?;
        let mut store = Self {
            path: path.to_path_buf(),
            canonical_path,
            region,
            layout,
            count,
            pool: Arc::new(AllocPool::new(Arc::clone(&options.allocator))),
            flush_on_drop: options.flush_on_drop,
        };
        if recovered.is_none() {
            store.write_header()?;
        }
        Ok(store)
    }

    /// Opens an existing store without write access.
    ///
    /// Every mutating operation on the returned handle fails with
    /// [`StorageError::ReadOnly`].
    pub fn open_readonly(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|source| StorageError::io(path, "open", source))?;
        let canonical_path = canonicalize(path)?;
        let header =
            StoreHeader::read_from(&file, path)?.ok_or_else(|| StorageError::InvalidFormat {
                path: path.to_path_buf(),
                reason: "missing store header".to_string(),
            })?;
        header.validate(path)?;
        let layout = layout_of(&header)?;

        let file_len = file_len(&file, path)?;
        if file_len < layout.total_size() as u64 {
            return Err(StorageError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!(
                    "file is {file_len} bytes but the header describes {}",
                    layout.total_size()
                ),
            });
        }

        let region = MappedRegion::read_only(file, path, layout.total_size())?;
        debug!(path = %path.display(), capacity = layout.capacity(), "opened vector store read-only");

        Ok(Self {
            path: path.to_path_buf(),
            canonical_path,
            region,
            layout,
            count: header.count as usize,
            pool: Arc::new(AllocPool::new(Arc::new(SystemStrategy))),
            flush_on_drop: false,
        })
    }

    /// Zero-copy view of the vector at `index`.
    ///
    /// Returns `None` if `index >= capacity`. Slots never written read as
    /// zeros.
    #[must_use]
    pub fn get_vector(&self, index: usize) -> Option<&[f32]> {
        self.get_batch(index, 1)
    }

    /// Mutable zero-copy view of the vector at `index`.
    ///
    /// Writing through the view does not advance the logical count. Returns
    /// `None` when out of bounds or read-only.
    #[must_use]
    pub fn get_vector_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.get_batch_mut(index, 1)
    }

    /// Copy of the vector at `index`.
    #[must_use]
    pub fn read_vector(&self, index: usize) -> Option<Vec<f32>> {
        self.get_vector(index).map(<[f32]>::to_vec)
    }

    /// Overwrites the slot at `index` with `data`.
    ///
    /// `data.len()` must equal the store's dimension. Writing at or beyond
    /// the logical count raises it to `index + 1` and persists it.
    pub fn set_vector(&mut self, index: usize, data: &[f32]) -> StorageResult<()> {
        self.ensure_writable()?;
        let range = self
            .layout
            .vectors(index, 1)
            .ok_or(StorageError::IndexOutOfBounds {
                index,
                capacity: self.layout.capacity(),
            })?;
        self.layout.dimension().validate(data.len())?;

        self.region.bytes_mut()?[range].copy_from_slice(bytemuck::cast_slice(data));
        self.advance_count(index + 1)
    }

    /// Zero-copy view of `count` contiguous vectors starting at `start`.
    ///
    /// Returns `None` if `start + count > capacity`.
    #[must_use]
    pub fn get_batch(&self, start: usize, count: usize) -> Option<&[f32]> {
        let range = self.layout.vectors(start, count)?;
        Some(bytemuck::cast_slice(&self.region.bytes()[range]))
    }

    #[must_use]
    pub fn get_batch_mut(&mut self, start: usize, count: usize) -> Option<&mut [f32]> {
        let range = self.layout.vectors(start, count)?;
        let bytes = self.region.bytes_mut().ok()?;
        Some(bytemuck::cast_slice_mut(&mut bytes[range]))
    }

    /// Copy of `count` contiguous vectors starting at `start`.
    #[must_use]
    pub fn read_batch(&self, start: usize, count: usize) -> Option<Vec<f32>> {
        self.get_batch(start, count).map(<[f32]>::to_vec)
    }

    /// Writes a contiguous run of vectors starting at slot `start`.
    ///
    /// `data` holds `data.len() / dim` row-major vectors and `dim` must equal
    /// the store's dimension. The whole run is validated before any byte is
    /// copied. An empty batch writes nothing and leaves the count untouched.
    pub fn set_batch(&mut self, start: usize, data: &[f32], dim: usize) -> StorageResult<()> {
        self.ensure_writable()?;
        let dimension = self.layout.dimension();
        dimension.validate(dim)?;
        if data.len() % dim != 0 {
            return Err(StorageError::MalformedBatch {
                len: data.len(),
                dimension: dim,
            });
        }

        let count = data.len() / dim;
        let range = self
            .layout
            .vectors(start, count)
            .ok_or(StorageError::InvalidRange {
                start,
                count,
                capacity: self.layout.capacity(),
            })?;
        if count == 0 {
            return Ok(());
        }

        self.region.bytes_mut()?[range].copy_from_slice(bytemuck::cast_slice(data));
        self.advance_count(start + count)
    }

    /// Payload stored in the metadata slot paired with `index`.
    ///
    /// Slots never written yield an empty payload.
    #[must_use]
    pub fn metadata(&self, index: usize) -> Option<&[u8]> {
        let slot = &self.region.bytes()[self.layout.metadata(index)?];
        let (prefix, payload) = slot.split_at(METADATA_LEN_PREFIX);
        let len = u32::from_ne_bytes(prefix.try_into().ok()?) as usize;
        Some(&payload[..len.min(METADATA_PAYLOAD_MAX)])
    }

    /// Replaces the metadata payload paired with `index`.
    ///
    /// Payloads are limited to [`METADATA_PAYLOAD_MAX`] bytes. Metadata
    /// writes do not affect the logical count.
    pub fn set_metadata(&mut self, index: usize, payload: &[u8]) -> StorageResult<()> {
        self.ensure_writable()?;
        let range = self
            .layout
            .metadata(index)
            .ok_or(StorageError::IndexOutOfBounds {
                index,
                capacity: self.layout.capacity(),
            })?;
        if payload.len() > METADATA_PAYLOAD_MAX {
            return Err(StorageError::MetadataTooLarge {
                len: payload.len(),
                max: METADATA_PAYLOAD_MAX,
            });
        }

        let slot = &mut self.region.bytes_mut()?[range];
        let (prefix, body) = slot.split_at_mut(METADATA_LEN_PREFIX);
        prefix.copy_from_slice(&(payload.len() as u32).to_ne_bytes());
        body[..payload.len()].copy_from_slice(payload);
        body[payload.len()..].fill(0);
        Ok(())
    }

    /// Changes the number of reserved slots.
    ///
    /// Slots below `min(old, new)` capacity keep their vectors and metadata.
    /// New slots read as zeros. Shrinking discards slots at or above
    /// `new_capacity` and clamps the logical count.
    ///
    /// The mapping may move; the returned [`Relocation`] reports where it
    /// went. On error the handle is in an unspecified state and must be
    /// discarded.
    pub fn resize(&mut self, new_capacity: usize) -> StorageResult<Relocation> {
        self.ensure_writable()?;
        let old = self.layout;
        if new_capacity == old.capacity() {
            return Ok(Relocation::unchanged(
                self.region.base_addr(),
                self.region.len(),
            ));
        }

        let new = SlotLayout::new(new_capacity, old.dimension())?;
        let kept = old.capacity().min(new_capacity) * METADATA_STRIDE;
        let old_metadata = old.metadata_region();
        let old_metadata = old_metadata.start..old_metadata.start + kept;

        let relocation = if new_capacity > old.capacity() {
            self.region.set_file_len(new.total_size())?;
            let relocation = self.region.grow_or_relocate(new.total_size())?;

            let bytes = self.region.bytes_mut()?;
            bytes.copy_within(old_metadata, new.metadata_offset());
            // The vacated metadata bytes now sit inside fresh vector slots.
            bytes[old.metadata_offset()..new.metadata_offset()].fill(0);
            bytes[new.metadata_offset() + kept..].fill(0);
            relocation
        } else {
            self.region
                .bytes_mut()?
                .copy_within(old_metadata, new.metadata_offset());
            let relocation = self.region.grow_or_relocate(new.total_size())?;
            self.region.set_file_len(new.total_size())?;
            relocation
        };

        self.layout = new;
        self.count = self.count.min(new_capacity);
        self.write_header()?;

        debug!(
            path = %self.path.display(),
            old_capacity = old.capacity(),
            new_capacity,
            moved = relocation.moved(),
            "resized vector store"
        );
        Ok(relocation)
    }

    /// Synchronously writes the mapped region back to the file.
    pub fn flush(&self) -> StorageResult<()> {
        self.region.flush()
    }

    /// Writes a byte-exact copy of the store to `dest`.
    ///
    /// The live store is flushed first. The copy is written to a temporary
    /// file next to `dest` and renamed into place, so `dest` is either the
    /// previous file or the complete checkpoint. Returns the bytes written.
    ///
    /// `dest` must not name the live file under any alias (symlink, hard
    /// link or relative spelling), and its parent directory must exist.
    pub fn checkpoint_to(&self, dest: impl AsRef<Path>) -> StorageResult<u64> {
        let dest = dest.as_ref();
        if self.is_live_file(dest)? {
            return Err(StorageError::io(
                dest,
                "checkpoint",
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "checkpoint target is the live store file",
                ),
            ));
        }
        self.flush()?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(dest))
            .map_err(|source| StorageError::io(dest, "create checkpoint", source))?;
        tmp.write_all(self.region.bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| StorageError::io(dest, "write checkpoint", source))?;
        tmp.persist(dest)
            .map_err(|e| StorageError::io(dest, "persist checkpoint", e.error))?;

        debug!(
            path = %self.path.display(),
            dest = %dest.display(),
            bytes = self.region.len(),
            "checkpointed vector store"
        );
        Ok(self.region.len() as u64)
    }

    /// Flushes and releases the store.
    ///
    /// Unlike dropping the handle, this reports a failed flush.
    pub fn close(mut self) -> StorageResult<()> {
        self.flush_on_drop = false;
        self.flush()
    }

    /// Allocates a zeroed side buffer from the store's allocator.
    pub fn alloc(&self, size: usize, align: usize) -> StorageResult<AlignedBlock> {
        self.pool.allocate(size, align)
    }

    /// Whether the configured side allocator tolerates concurrent use.
    #[must_use]
    pub fn is_thread_safe(&self) -> bool {
        self.pool.is_thread_safe()
    }

    #[must_use]
    pub fn stats(&self) -> StorageStats {
        let dimension = self.layout.dimension();
        StorageStats {
            total_vectors: self.count,
            capacity: self.layout.capacity(),
            dimension: dimension.get(),
            memory_used: (self.count * dimension.stride()) as u64,
            memory_mapped: self.region.len() as u64,
            pool_allocated: self.pool.allocated_bytes(),
            pool_freed: self.pool.freed_bytes(),
            avg_alloc_time_ns: self.pool.avg_alloc_time_ns(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// Highest written slot index plus one.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.layout.dimension()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.region.is_read_only()
    }

    #[must_use]
    pub fn mapped_len(&self) -> usize {
        self.region.len()
    }

    /// Current base address of the mapping. Changes only across `resize`.
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.region.base_addr()
    }

    /// Whether `dest` resolves to the file backing this store.
    fn is_live_file(&self, dest: &Path) -> StorageResult<bool> {
        let resolved = match dest.canonicalize() {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let Some(name) = dest.file_name() else {
                    return Ok(false);
                };
                canonicalize(parent_dir(dest))?.join(name)
            }
            Err(source) => return Err(StorageError::io(dest, "resolve path", source)),
        };
        if resolved == self.canonical_path {
            return Ok(true);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            // Hard links share the inode but not the path.
            if let Ok(target) = std::fs::metadata(&resolved) {
                let live = self.region.file_metadata()?;
                return Ok(live.dev() == target.dev() && live.ino() == target.ino());
            }
        }
        Ok(false)
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        if self.region.is_read_only() {
            return Err(StorageError::ReadOnly {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn advance_count(&mut self, end: usize) -> StorageResult<()> {
        if end > self.count {
            self.count = end;
            self.write_header()?;
        }
        Ok(())
    }

    fn write_header(&mut self) -> StorageResult<()> {
        let header = StoreHeader::new(&self.layout, self.count);
        self.region.bytes_mut()?[..HEADER_SIZE].copy_from_slice(header.as_bytes());
        Ok(())
    }
}

impl Drop for VectorStore {
    fn drop(&mut self) {
        if self.flush_on_drop && !self.region.is_read_only() {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), "flush on drop failed: {e}");
            }
        }
    }
}

fn canonicalize(path: &Path) -> StorageResult<PathBuf> {
    path.canonicalize()
        .map_err(|source| StorageError::io(path, "resolve path", source))
}

/// Directory containing `path`, with a bare file name meaning the current one.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn file_len(file: &File, path: &Path) -> StorageResult<u64> {
    file.metadata()
        .map(|meta| meta.len())
        .map_err(|source| StorageError::io(path, "stat", source))
}

/// Layout described by a header that already passed validation.
fn layout_of(header: &StoreHeader) -> StorageResult<SlotLayout> {
    let dimension = VectorDimension::new(header.dimension as usize)?;
    SlotLayout::new(header.capacity as usize, dimension)
}
