//! Side allocator for ad hoc aligned buffers.
//!
//! These allocations are unrelated to the mapped vector region. They are
//! served by a pluggable [`AllocStrategy`] chosen when a store is opened and
//! tracked only by cumulative counters for diagnostics.

mod pool;
mod strategy;

pub use pool::{AlignedBlock, AllocPool};
#[cfg(feature = "mimalloc")]
pub use strategy::MiMallocStrategy;
pub use strategy::{AllocStrategy, AllocatorKind, SystemStrategy};
