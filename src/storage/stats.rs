use serde::Serialize;

/// Point-in-time statistics for a store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageStats {
    /// Logical count (highest written index + 1).
    pub total_vectors: usize,
    pub capacity: usize,
    pub dimension: usize,
    /// Bytes covered by the logical count: `count * dimension * 4`.
    pub memory_used: u64,
    /// Total bytes currently mapped.
    pub memory_mapped: u64,
    /// Cumulative bytes handed out by the side allocator.
    pub pool_allocated: u64,
    /// Cumulative bytes returned to the side allocator.
    pub pool_freed: u64,
    /// Mean side-allocation latency in nanoseconds.
    pub avg_alloc_time_ns: f64,
}

impl StorageStats {
    /// Fraction of reserved slots below the logical count.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.total_vectors as f64 / self.capacity as f64
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
