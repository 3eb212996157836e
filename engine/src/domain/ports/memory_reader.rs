//! MemoryUsageReader port
//! Interface for sampling a child's resident memory

/// Port for reading resident memory of a running process.
/// Returns None when the process is gone or usage cannot be determined;
/// a missing sample is never treated as a limit breach.
pub trait MemoryUsageReader: Send + Sync {
    fn rss_bytes(&self, pid: u32) -> Option<u64>;
}
