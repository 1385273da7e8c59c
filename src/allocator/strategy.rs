use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Underlying allocator behind an [`AllocPool`](super::AllocPool).
///
/// # Safety
///
/// Implementations must uphold the [`GlobalAlloc`] contract: `alloc` returns
/// null or a block valid for `layout`, and `dealloc` accepts exactly the
/// pointers and layouts previously handed out by `alloc`.
pub unsafe trait AllocStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Whether the allocator may be called from several threads at once.
    fn is_thread_safe(&self) -> bool;

    /// # Safety
    /// `layout` must have a non-zero size.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8;

    /// # Safety
    /// `ptr` must come from `alloc` on this strategy with the same `layout`.
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

/// The platform system allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemStrategy;

unsafe impl AllocStrategy for SystemStrategy {
    fn name(&self) -> &'static str {
        "system"
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded contract, layout is non-zero sized.
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { System.dealloc(ptr, layout) }
    }
}

/// mimalloc, available with the `mimalloc` feature.
#[cfg(feature = "mimalloc")]
#[derive(Debug, Default, Clone, Copy)]
pub struct MiMallocStrategy;

#[cfg(feature = "mimalloc")]
unsafe impl AllocStrategy for MiMallocStrategy {
    fn name(&self) -> &'static str {
        "mimalloc"
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded contract.
        unsafe { mimalloc::MiMalloc.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { mimalloc::MiMalloc.dealloc(ptr, layout) }
    }
}

/// Allocator selection as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocatorKind {
    #[default]
    System,
    Mimalloc,
}

impl AllocatorKind {
    /// Instantiates the selected strategy.
    ///
    /// Fails if the strategy was not compiled in.
    pub fn strategy(self) -> StorageResult<Arc<dyn AllocStrategy>> {
        match self {
            Self::System => Ok(Arc::new(SystemStrategy)),
            #[cfg(feature = "mimalloc")]
            Self::Mimalloc => Ok(Arc::new(MiMallocStrategy)),
            #[cfg(not(feature = "mimalloc"))]
            Self::Mimalloc => Err(StorageError::Config {
                reason: "allocator \"mimalloc\" requires building with the `mimalloc` feature"
                    .to_string(),
            }),
        }
    }
}
