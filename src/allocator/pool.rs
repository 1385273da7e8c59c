use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::strategy::AllocStrategy;
use crate::error::{StorageError, StorageResult};

/// Counting front-end over an [`AllocStrategy`].
///
/// Tracks cumulative bytes handed out and returned, plus the time spent in
/// the underlying allocator. There is no free list and no leak detection.
pub struct AllocPool {
    strategy: Arc<dyn AllocStrategy>,
    allocated: AtomicU64,
    freed: AtomicU64,
    allocations: AtomicU64,
    alloc_nanos: AtomicU64,
}

impl AllocPool {
    pub fn new(strategy: Arc<dyn AllocStrategy>) -> Self {
        Self {
            strategy,
            allocated: AtomicU64::new(0),
            freed: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            alloc_nanos: AtomicU64::new(0),
        }
    }

    /// Allocates a zeroed block of `size` bytes aligned to `align`.
    ///
    /// The block returns itself to this pool when dropped.
    pub fn allocate(self: &Arc<Self>, size: usize, align: usize) -> StorageResult<AlignedBlock> {
        if size == 0 {
            return Err(StorageError::Allocation {
                size,
                align,
                reason: "size must be non-zero",
            });
        }
        let layout = Layout::from_size_align(size, align).map_err(|_| StorageError::Allocation {
            size,
            align,
            reason: "alignment must be a power of two and size must not overflow",
        })?;

        let started = Instant::now();
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { self.strategy.alloc(layout) };
        let elapsed = started.elapsed().as_nanos() as u64;

        let ptr = NonNull::new(raw).ok_or(StorageError::Allocation {
            size,
            align,
            reason: "allocator returned null",
        })?;
        // SAFETY: ptr is valid for `size` bytes.
        unsafe { ptr.as_ptr().write_bytes(0, size) };

        self.allocated.fetch_add(size as u64, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.alloc_nanos.fetch_add(elapsed, Ordering::Relaxed);

        Ok(AlignedBlock {
            ptr,
            layout,
            pool: Arc::clone(self),
        })
    }

    fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: only called from AlignedBlock::drop with the pointer and
        // layout produced by `allocate` on this pool.
        unsafe { self.strategy.dealloc(ptr.as_ptr(), layout) };
        self.freed.fetch_add(layout.size() as u64, Ordering::Relaxed);
    }

    /// Cumulative bytes allocated.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Cumulative bytes freed.
    pub fn freed_bytes(&self) -> u64 {
        self.freed.load(Ordering::Relaxed)
    }

    /// Mean time spent in the underlying allocator, 0.0 before any call.
    pub fn avg_alloc_time_ns(&self) -> f64 {
        let count = self.allocations.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.alloc_nanos.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn strategy(&self) -> &dyn AllocStrategy {
        self.strategy.as_ref()
    }

    pub fn is_thread_safe(&self) -> bool {
        self.strategy.is_thread_safe()
    }
}

impl fmt::Debug for AllocPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocPool")
            .field("strategy", &self.strategy.name())
            .field("allocated", &self.allocated_bytes())
            .field("freed", &self.freed_bytes())
            .finish()
    }
}

/// An owned, zero-initialized, aligned buffer from an [`AllocPool`].
pub struct AlignedBlock {
    ptr: NonNull<u8>,
    layout: Layout,
    pool: Arc<AllocPool>,
}

// SAFETY: the block exclusively owns its memory and the strategy is Send + Sync.
unsafe impl Send for AlignedBlock {}
unsafe impl Sync for AlignedBlock {}

impl AlignedBlock {
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    pub fn align(&self) -> usize {
        self.layout.align()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the block is initialized and valid for `len` bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` gives exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for AlignedBlock {
    fn drop(&mut self) {
        self.pool.release(self.ptr, self.layout);
    }
}

impl fmt::Debug for AlignedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBlock")
            .field("ptr", &self.ptr)
            .field("len", &self.len())
            .field("align", &self.align())
            .finish()
    }
}
