//! Write path: `append()` and segment rotation.
//!
//! All mutations flow through this module. Each version is written to the
//! segment log first; only after the write lands are the recency cache and
//! the full-text index updated: the cache synchronously (it must never be
//! stale relative to the log), the index best-effort (its failure is logged
//! and swallowed, never turned into a write failure).

use model::Note;
use segment::SegmentWriter;
use std::path::Path;
use tracing::warn;

use crate::manifest::Manifest;
use crate::{Store, StoreError, SEGMENTS_DIRNAME};

impl Store {
    /// Appends one note version (update or tombstone) to the log.
    ///
    /// If the serialized record would push a non-empty active segment past
    /// the manifest's size cap, the log rotates first; the record itself is
    /// always written whole, even when it alone exceeds the cap.
    ///
    /// # Errors
    ///
    /// Only log-side failures (rotation, serialization, disk) propagate.
    /// A failed index notification is recorded via `tracing` and dropped.
    pub fn append(&mut self, note: &Note) -> Result<(), StoreError> {
        let record_len = segment::encoded_len(note)?;
        if self
            .active
            .would_exceed(record_len, self.manifest.segment_size_bytes)
        {
            self.rotate()?;
        }

        self.active.append(note)?;

        // Cache follows the log in append order. A tombstone removes the id
        // outright so a later re-creation is not masked by a stale entry.
        if note.deleted {
            self.cache.remove(&note.id);
        } else {
            self.cache.put(note.id.clone(), note.clone());
        }

        if let Some(idx) = self.index.as_mut() {
            let result = if note.deleted {
                idx.remove(&note.id)
            } else {
                idx.index(note)
            };
            if let Err(e) = result {
                warn!(id = %note.id, error = %e, "full-text index update failed; log remains authoritative");
            }
        }

        Ok(())
    }

    /// Seals the active segment and opens its successor.
    ///
    /// The new segment's sequence comes from the manifest, which is bumped
    /// and persisted durably *before* the swap; if persisting fails, the
    /// whole rotation fails and the previous active segment stays in place.
    /// (An orphaned empty file on disk is tolerable; a reused sequence
    /// number is not.)
    pub(crate) fn rotate(&mut self) -> Result<(), StoreError> {
        let writer = create_segment(&self.root, &mut self.manifest)?;

        // Sealing: the old handle is dropped once its successor is named
        // in the durable manifest.
        let mut old = std::mem::replace(&mut self.active, writer);
        let _ = old.sync();
        Ok(())
    }
}

/// Creates the segment named by `manifest.next_segment_seq`, then bumps and
/// persists the manifest. Used by rotation and by first-open.
pub(crate) fn create_segment(
    root: &Path,
    manifest: &mut Manifest,
) -> Result<SegmentWriter, StoreError> {
    let seq = manifest.next_segment_seq;
    let path = root
        .join(SEGMENTS_DIRNAME)
        .join(segment::segment_file_name(seq));
    let writer = SegmentWriter::open(&path, seq)?;

    manifest.next_segment_seq += 1;
    if let Err(e) = manifest.save(root) {
        manifest.next_segment_seq -= 1;
        return Err(e);
    }
    Ok(writer)
}
