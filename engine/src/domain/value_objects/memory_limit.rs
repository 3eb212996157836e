//! MemoryLimit value object
//! Resident-memory ceiling that triggers a forced restart when exceeded

use crate::domain::constants::{BYTES_PER_GB, BYTES_PER_KB, BYTES_PER_MB, BYTES_PER_TB};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional memory ceiling for a unit's child process.
///
/// Sizes use the binary convention throughout: `"1G"` is 2^30 =
/// 1,073,741,824 bytes. The ceiling is exclusive: usage equal to the limit
/// does not trigger, usage strictly above it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MemoryLimit {
    max_bytes: Option<u64>,
}

impl MemoryLimit {
    /// No ceiling configured
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: u64) -> Self {
        Self {
            max_bytes: Some(bytes),
        }
    }

    /// Parse a human-readable size string into a limit
    /// Examples: "256M" -> 268435456, "1G" -> 1073741824, "512K" -> 524288
    pub fn parse(s: &str) -> Result<Self, String> {
        Ok(Self::from_bytes(Self::parse_bytes(s)?))
    }

    pub fn max_bytes(&self) -> Option<u64> {
        self.max_bytes
    }

    pub fn has_limit(&self) -> bool {
        self.max_bytes.is_some()
    }

    /// Check whether a sampled resident size breaches the ceiling
    pub fn is_exceeded_by(&self, rss_bytes: u64) -> bool {
        matches!(self.max_bytes, Some(max) if rss_bytes > max)
    }

    /// Parse a memory string to bytes
    fn parse_bytes(mem_str: &str) -> Result<u64, String> {
        let mem_str = mem_str.trim();
        if mem_str.is_empty() {
            return Err("Empty memory string".to_string());
        }

        // Check for unit suffix
        let (value_str, multiplier) = if let Some(v) = mem_str.strip_suffix('K') {
            (v, BYTES_PER_KB)
        } else if let Some(v) = mem_str.strip_suffix('M') {
            (v, BYTES_PER_MB)
        } else if let Some(v) = mem_str.strip_suffix('G') {
            (v, BYTES_PER_GB)
        } else if let Some(v) = mem_str.strip_suffix('T') {
            (v, BYTES_PER_TB)
        } else {
            // No suffix, assume bytes
            (mem_str, 1_u64)
        };

        let value: u64 = value_str
            .parse()
            .map_err(|e| format!("Invalid memory value '{}': {}", mem_str, e))?;

        Ok(value * multiplier)
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_bytes {
            None => write!(f, "no-limit"),
            Some(bytes) if bytes >= BYTES_PER_GB && bytes % BYTES_PER_GB == 0 => {
                write!(f, "{}G", bytes / BYTES_PER_GB)
            }
            Some(bytes) if bytes >= BYTES_PER_MB && bytes % BYTES_PER_MB == 0 => {
                write!(f, "{}M", bytes / BYTES_PER_MB)
            }
            Some(bytes) if bytes >= BYTES_PER_KB && bytes % BYTES_PER_KB == 0 => {
                write!(f, "{}K", bytes / BYTES_PER_KB)
            }
            Some(bytes) => write!(f, "{}B", bytes),
        }
    }
}
