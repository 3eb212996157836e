//! Procfs memory reader
//! Samples a child's resident set size from /proc/<pid>/statm

use crate::domain::ports::MemoryUsageReader;
use tracing::debug;

/// Reads resident memory from procfs.
/// On systems without /proc the sample is simply absent, which the memory
/// watcher treats as "no data", never as a breach.
pub struct ProcfsMemoryReader {
    page_size: u64,
}

impl ProcfsMemoryReader {
    pub fn new() -> Self {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        Self {
            page_size: if page_size > 0 {
                page_size as u64
            } else {
                4096
            },
        }
    }
}

impl Default for ProcfsMemoryReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUsageReader for ProcfsMemoryReader {
    fn rss_bytes(&self, pid: u32) -> Option<u64> {
        let path = format!("/proc/{}/statm", pid);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(pid = pid, error = %e, "No memory sample available");
                return None;
            }
        };

        // statm: size resident shared text lib data dt (in pages)
        let resident_pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
        Some(resident_pages * self.page_size)
    }
}
