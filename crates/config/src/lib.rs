//! Store configuration.
//!
//! All settings have sensible defaults and can be overridden through
//! environment variables:
//!
//! ```text
//! JOTLOG_ROOT        storage root directory      (default: ~/.jotlog)
//! JOTLOG_SEGMENT_KB  segment size cap in KiB     (default: 8192 = 8 MiB)
//! JOTLOG_CACHE_CAP   recency cache entry count   (default: 4096)
//! JOTLOG_FULLTEXT    enable full-text accelerator (default: "true")
//! ```
//!
//! The segment size only matters the first time a storage root is created;
//! after that the manifest on disk is the source of truth.

use std::path::PathBuf;

/// Default segment size cap: 8 MiB. Large enough to keep the file count
/// low, small enough that one corrupt segment cannot take much history
/// with it.
pub const DEFAULT_SEGMENT_SIZE: u64 = 8 * 1024 * 1024;

/// Default recency cache capacity, in entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Options for opening a [`Store`](../store/struct.Store.html).
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Storage root directory; created on first open.
    pub root: PathBuf,
    /// Segment size cap in bytes, used when creating a fresh manifest.
    pub segment_size_bytes: u64,
    /// Maximum number of entries in the recency cache.
    pub cache_capacity: usize,
    /// Whether to attach the full-text accelerator.
    pub fulltext: bool,
}

impl StoreOptions {
    /// Options rooted at `root` with all other settings at their defaults.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Builds options from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let root = std::env::var_os("JOTLOG_ROOT")
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(defaults.root);
        let segment_kb: u64 = env_or("JOTLOG_SEGMENT_KB", "8192")
            .parse()
            .unwrap_or(DEFAULT_SEGMENT_SIZE / 1024);
        let cache_capacity: usize = env_or("JOTLOG_CACHE_CAP", "4096")
            .parse()
            .unwrap_or(DEFAULT_CACHE_CAPACITY);
        let fulltext: bool = env_or("JOTLOG_FULLTEXT", "true").parse().unwrap_or(true);

        Self {
            root,
            segment_size_bytes: segment_kb * 1024,
            cache_capacity,
            fulltext,
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            root: default_root(),
            segment_size_bytes: DEFAULT_SEGMENT_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fulltext: true,
        }
    }
}

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn default_root() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".jotlog"),
        _ => PathBuf::from(".jotlog"),
    }
}
