//! # Store - Jotlog Storage Engine
//!
//! The central orchestrator that ties together the [`segment`], [`cache`],
//! and [`fulltext`] crates into a complete append-only note store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌──────────────────────────────────────────────────┐
//! │                    STORE                         │
//! │                                                  │
//! │ write.rs → segment append → cache put/remove     │
//! │              |                    |              │
//! │              |  (size threshold?) | (best-effort)│
//! │              |         yes        v              │
//! │              v              fulltext index       │
//! │           rotate() → new segment + manifest save │
//! │                                                  │
//! │ read.rs → cache → reverse segment scan           │
//! │           list → index fast path → full fold     │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                                |
//! |--------------|--------------------------------------------------------|
//! | [`lib.rs`]   | `Store` struct, open/close lifecycle, snapshot, `Drop` |
//! | [`manifest`] | Segment sizing policy + next sequence (atomic file ops)|
//! | [`write`]    | `append()`, rotation                                   |
//! | [`read`]     | `get_by_id()`, `list()`, fold-over-history rebuild     |
//!
//! ## Consistency Contract
//!
//! The segment log is the single source of truth; after any successful
//! `append`, a later `get_by_id`/`list` on the same store instance reflects
//! it. The cache and the full-text index are accelerators: they are updated
//! after (and only after) the log write lands, their failures are logged and
//! swallowed, and losing either merely costs latency, never answers.
//!
//! ## Concurrency
//!
//! Single-process, single-writer. Every mutating operation takes
//! `&mut self`, so the {active segment, cache, manifest next-sequence}
//! triple is serialized by construction; there is no internal locking.

mod manifest;
mod read;
mod write;

use cache::LruCache;
use config::StoreOptions;
use fulltext::{FileIndex, TextIndex};
use manifest::Manifest;
use model::Note;
use segment::SegmentWriter;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub use manifest::MANIFEST_FILENAME;

/// Directory under the storage root holding segment files.
pub const SEGMENTS_DIRNAME: &str = "segments";

/// Cache snapshot file at the storage root: a JSON array of the live notes
/// that were resident in the recency cache at close.
pub const CACHE_SNAPSHOT_FILENAME: &str = "lru_cache.json";

/// Errors surfaced by store operations.
///
/// Only the log itself may fail a write; accelerator trouble (cache
/// snapshot, full-text index) is downgraded to a log line and never appears
/// here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The id is absent, or its latest version is a tombstone.
    #[error("note not found")]
    NotFound,

    /// Missing, unreadable, or corrupt manifest at open. Fatal: segment
    /// numbering integrity depends on it, so there is no auto-repair.
    #[error("manifest: {0}")]
    Manifest(String),

    /// An underlying I/O failure on the write path.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A segment-level failure.
    #[error(transparent)]
    Segment(#[from] segment::SegmentError),

    /// A record could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Selection criteria for [`Store::list`]. Constraints are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Exact tag membership.
    pub tag: Option<String>,
    /// Case-insensitive substring over `title + " " + body`.
    pub contains: Option<String>,
    /// Maximum results; `0` means unbounded.
    pub limit: usize,
}

/// The note store: segment log (source of truth), recency cache and
/// full-text index (accelerators), and the manifest that governs rotation.
pub struct Store {
    root: PathBuf,
    pub(crate) manifest: Manifest,
    pub(crate) active: SegmentWriter,
    pub(crate) cache: LruCache<Note>,
    pub(crate) index: Option<Box<dyn TextIndex>>,
    closed: bool,
}

impl Store {
    /// Opens the store rooted at `options.root`, creating the directory
    /// layout and a default manifest on first use.
    ///
    /// # Steps
    ///
    /// 1. Ensure the root, `segments/` directory, and manifest exist.
    /// 2. Load the manifest (fatal if corrupt).
    /// 3. Pre-warm the recency cache from the snapshot file (non-fatal).
    /// 4. Open the highest-numbered segment for append, or create the
    ///    first one.
    /// 5. Attach the full-text index, best-effort.
    pub fn open(options: StoreOptions) -> Result<Self, StoreError> {
        let attach = options.fulltext;
        Self::open_inner(options, |root| {
            if !attach {
                return None;
            }
            match FileIndex::open(root) {
                Ok(idx) => Some(Box::new(idx) as Box<dyn TextIndex>),
                Err(e) => {
                    warn!(error = %e, "full-text index unavailable, continuing without it");
                    None
                }
            }
        })
    }

    /// Opens the store with a caller-supplied search accelerator (or none),
    /// ignoring `options.fulltext`.
    pub fn open_with_index(
        options: StoreOptions,
        index: Option<Box<dyn TextIndex>>,
    ) -> Result<Self, StoreError> {
        Self::open_inner(options, move |_| index)
    }

    fn open_inner<F>(options: StoreOptions, attach_index: F) -> Result<Self, StoreError>
    where
        F: FnOnce(&Path) -> Option<Box<dyn TextIndex>>,
    {
        let root = options.root;
        Manifest::ensure(&root, options.segment_size_bytes)?;
        let mut manifest = Manifest::open(&root)?;

        let mut cache = LruCache::new(options.cache_capacity);
        load_cache_snapshot(&root, &mut cache);

        let active = open_active_segment(&root, &mut manifest)?;
        let index = attach_index(&root);

        Ok(Self {
            root,
            manifest,
            active,
            cache,
            index,
            closed: false,
        })
    }

    /// Flushes and releases everything: cache snapshot, full-text index,
    /// and the active segment handle.
    ///
    /// Accelerator flushes are best-effort; only a failure to sync the log
    /// itself is returned. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.save_cache_snapshot() {
            warn!(error = %e, "failed to persist cache snapshot; next open starts cold");
        }
        if let Some(idx) = self.index.as_mut() {
            if let Err(e) = idx.close() {
                warn!(error = %e, "full-text index close failed");
            }
        }

        self.active.sync()?;
        Ok(())
    }

    /// Storage root this store was opened on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of entries currently resident in the recency cache.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Empties the recency cache. Results of subsequent reads are
    /// unchanged; only their latency is.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Sequence number the next rotation will use.
    pub fn next_segment_seq(&self) -> u32 {
        self.manifest.next_segment_seq
    }

    /// Sequence number of the segment currently accepting appends.
    pub fn active_segment_seq(&self) -> u32 {
        self.active.seq()
    }

    /// Size in bytes of the segment currently accepting appends.
    pub fn active_segment_size(&self) -> u64 {
        self.active.size()
    }

    /// Whether a search accelerator is attached.
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    pub(crate) fn segments_dir(&self) -> PathBuf {
        self.root.join(SEGMENTS_DIRNAME)
    }

    fn save_cache_snapshot(&self) -> Result<(), StoreError> {
        // Persist live entries oldest-recency-first so that re-inserting
        // them in file order on load restores the same LRU order.
        let mut notes: Vec<&Note> = self
            .cache
            .iter()
            .map(|(_, n)| n)
            .filter(|n| !n.deleted)
            .collect();
        notes.reverse();

        let bytes = serde_json::to_vec_pretty(&notes)?;
        std::fs::write(snapshot_path(&self.root), bytes)?;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("segment_size_bytes", &self.manifest.segment_size_bytes)
            .field("next_segment_seq", &self.manifest.next_segment_seq)
            .field("active_segment_seq", &self.active.seq())
            .field("active_segment_size", &self.active.size())
            .field("cache_len", &self.cache.len())
            .field("cache_capacity", &self.cache.capacity())
            .field("fulltext", &self.index.is_some())
            .finish()
    }
}

/// Best-effort close on drop, mirroring the explicit [`Store::close`].
/// Errors are ignored because `Drop` cannot propagate them; the log itself
/// was already flushed per append.
impl Drop for Store {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

/// Opens the highest-numbered existing segment for append, or creates the
/// first one via the rotation path.
fn open_active_segment(root: &Path, manifest: &mut Manifest) -> Result<SegmentWriter, StoreError> {
    let seg_dir = root.join(SEGMENTS_DIRNAME);
    let segments = segment::list_segments(&seg_dir)?;

    match segments.last() {
        Some(last) => {
            let seq = last
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(segment::parse_segment_seq)
                .expect("list_segments only yields parsable names");
            Ok(SegmentWriter::open(last, seq)?)
        }
        None => write::create_segment(root, manifest),
    }
}

/// Idempotently creates the storage layout at `root` (directories plus a
/// default manifest) without opening a store. [`Store::open`] does this
/// implicitly.
pub fn ensure(root: &Path, segment_size_bytes: u64) -> Result<(), StoreError> {
    Manifest::ensure(root, segment_size_bytes)
}

fn snapshot_path(root: &Path) -> PathBuf {
    root.join(CACHE_SNAPSHOT_FILENAME)
}

/// Pre-warms `cache` from the snapshot file. A missing or corrupt snapshot
/// is non-fatal: the cache starts cold and the log remains authoritative.
fn load_cache_snapshot(root: &Path, cache: &mut LruCache<Note>) {
    let bytes = match std::fs::read(snapshot_path(root)) {
        Ok(b) => b,
        Err(_) => return,
    };
    let notes: Vec<Note> = match serde_json::from_slice(&bytes) {
        Ok(n) => n,
        Err(e) => {
            debug!(error = %e, "cache snapshot unreadable; starting cold");
            return;
        }
    };
    for note in notes {
        if !note.deleted {
            cache.put(note.id.clone(), note);
        }
    }
}

#[cfg(test)]
mod tests;
