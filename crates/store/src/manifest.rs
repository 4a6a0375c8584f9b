//! # Manifest - segment policy metadata
//!
//! The log's only piece of mutable global metadata: segment size policy and
//! the next segment sequence number. Persisted as `manifest.json` at the
//! storage root:
//!
//! ```text
//! {
//!   "version": 1,
//!   "segment_size_bytes": 8388608,
//!   "next_segment_seq": 3,
//!   "created_at_unix": 1722470400
//! }
//! ```
//!
//! Only `next_segment_seq` is mutated after creation, and it is persisted
//! durably *before* a rotated segment accepts appends, so a crash can never
//! produce two segments claiming the same sequence number.
//!
//! ## Crash Safety
//!
//! The manifest is rewritten atomically: write to a `.tmp` file, fsync,
//! then rename over the existing manifest, so it is never observed
//! partially written.

use crate::{StoreError, SEGMENTS_DIRNAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Name of the manifest file within the storage root.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Temporary file used during atomic manifest writes.
const MANIFEST_TMP_FILENAME: &str = "manifest.json.tmp";

/// The only manifest version this build reads or writes.
const MANIFEST_VERSION: u32 = 1;

/// In-memory representation of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Soft size cap for a segment, in bytes.
    pub segment_size_bytes: u64,
    /// Sequence number the next rotation will assign.
    pub next_segment_seq: u32,
    /// Unix timestamp of store creation.
    pub created_at_unix: i64,
}

impl Manifest {
    /// Idempotently creates the storage layout: the root, the `segments/`
    /// directory, and a default manifest, without ever overwriting an
    /// existing manifest.
    pub fn ensure(root: &Path, segment_size_bytes: u64) -> Result<(), StoreError> {
        fs::create_dir_all(root.join(SEGMENTS_DIRNAME))?;

        let path = root.join(MANIFEST_FILENAME);
        if path.exists() {
            return Ok(());
        }

        let man = Manifest {
            version: MANIFEST_VERSION,
            segment_size_bytes,
            next_segment_seq: 1,
            created_at_unix: Utc::now().timestamp(),
        };
        man.save(root)
    }

    /// Loads and parses the manifest.
    ///
    /// A missing or corrupt manifest is a fatal open-time error: segment
    /// numbering integrity depends on it, so there is no silent recovery.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let path = root.join(MANIFEST_FILENAME);
        let bytes = fs::read(&path)
            .map_err(|e| StoreError::Manifest(format!("cannot read {}: {e}", path.display())))?;
        let man: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Manifest(format!("cannot parse {}: {e}", path.display())))?;

        if man.version != MANIFEST_VERSION {
            return Err(StoreError::Manifest(format!(
                "unsupported manifest version {} (expected {})",
                man.version, MANIFEST_VERSION
            )));
        }
        Ok(man)
    }

    /// Persists the manifest atomically: tmp file, fsync, rename.
    pub fn save(&self, root: &Path) -> Result<(), StoreError> {
        let path = root.join(MANIFEST_FILENAME);
        let tmp = root.join(MANIFEST_TMP_FILENAME);

        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            serde_json::to_writer_pretty(&mut f, self)?;
            f.write_all(b"\n")?;
            f.flush()?;
            f.sync_all()?;
        }

        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
