//! Read path: `get_by_id()`, `list()`, and fold-over-history reconstruction.
//!
//! There is no "current" table anywhere; current state is always derived
//! from the log. Point lookups try the recency cache first, then scan
//! segments newest-first and stop at the first segment holding any version
//! of the id (within a segment the last version wins, and a tombstone there
//! decides absence outright). Listing reconstructs the full live set unless
//! the full-text accelerator can supply candidate ids.

use model::Note;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::{Filter, Store, StoreError};

impl Store {
    /// Returns the current version of `id`, or [`StoreError::NotFound`] if
    /// the id was never written or its latest version is a tombstone.
    ///
    /// A cache hit (including a cached tombstone) answers without
    /// touching the log. A live answer found by scanning warms the cache.
    pub fn get_by_id(&mut self, id: &str) -> Result<Note, StoreError> {
        if let Some(hit) = self.cache.get(id) {
            // A cached tombstone is a confirmed absence, not a miss.
            if hit.deleted {
                return Err(StoreError::NotFound);
            }
            return Ok(hit.clone());
        }

        let segments = segment::list_segments(&self.segments_dir())?;
        for path in segments.iter().rev() {
            let mut found: Option<Note> = None;
            let skipped = segment::replay(path, |n| {
                if n.id == id {
                    found = Some(n);
                }
            })?;
            if skipped > 0 {
                debug!(segment = %path.display(), skipped, "skipped unparsable segment lines");
            }

            if let Some(version) = found {
                // Newest segment containing the id is decisive: stopping at
                // the first hit in reverse order equals taking the maximum
                // in forward order.
                if version.deleted {
                    return Err(StoreError::NotFound);
                }
                self.cache.put(version.id.clone(), version.clone());
                return Ok(version);
            }
        }

        Err(StoreError::NotFound)
    }

    /// Derives the complete live record set by folding over every segment
    /// in ascending sequence order: later versions win, tombstones remove.
    ///
    /// This is the O(log size) correctness fallback; the cache and the
    /// full-text index exist to keep it off the common path.
    pub fn reconstruct(&self) -> Result<HashMap<String, Note>, StoreError> {
        let mut live: HashMap<String, Note> = HashMap::new();

        for path in segment::list_segments(&self.segments_dir())? {
            let skipped = segment::replay(&path, |n| {
                if n.deleted {
                    live.remove(&n.id);
                } else {
                    live.insert(n.id.clone(), n);
                }
            })?;
            if skipped > 0 {
                debug!(segment = %path.display(), skipped, "skipped unparsable segment lines");
            }
        }

        Ok(live)
    }

    /// Returns live notes matching `filter`, newest first by `created_at`,
    /// truncated to `filter.limit` (`0` = unbounded).
    ///
    /// With a `contains` filter and an attached index, candidate ids come
    /// from the accelerator. An index error *and* an empty index answer are
    /// treated identically: fall back to the full scan. The conflation is
    /// deliberate: the index may lag the log, so "found nothing" is read
    /// as "don't know" and the log gets the final word.
    pub fn list(&mut self, filter: &Filter) -> Result<Vec<Note>, StoreError> {
        let query = filter
            .contains
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        if let Some(q) = query {
            if self.index.is_some() {
                if let Some(out) = self.list_via_index(q, filter) {
                    return Ok(out);
                }
            }
        }

        self.list_via_scan(filter)
    }

    /// Index fast path. `None` means "fall back to the scan".
    fn list_via_index(&mut self, query: &str, filter: &Filter) -> Option<Vec<Note>> {
        let idx = self.index.as_mut()?;
        let ids = match idx.search(query, filter.limit) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "full-text search failed; falling back to scan");
                return None;
            }
        };
        if ids.is_empty() {
            return None;
        }

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            if filter.limit > 0 && out.len() >= filter.limit {
                break;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            // The index may reference ids that are by now tombstoned or
            // that it simply misremembers; the log decides.
            let note = match self.get_by_id(&id) {
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Some(tag) = &filter.tag {
                if !note.tags.iter().any(|t| t == tag) {
                    continue;
                }
            }
            out.push(note);
        }

        sort_newest_first(&mut out);
        Some(out)
    }

    fn list_via_scan(&self, filter: &Filter) -> Result<Vec<Note>, StoreError> {
        let needle = filter
            .contains
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut out: Vec<Note> = self
            .reconstruct()?
            .into_values()
            .filter(|n| {
                if let Some(tag) = &filter.tag {
                    if !n.tags.iter().any(|t| t == tag) {
                        return false;
                    }
                }
                if let Some(q) = &needle {
                    let hay = format!("{} {}", n.title, n.body).to_lowercase();
                    if !hay.contains(q.as_str()) {
                        return false;
                    }
                }
                true
            })
            .collect();

        sort_newest_first(&mut out);
        if filter.limit > 0 {
            out.truncate(filter.limit);
        }
        Ok(out)
    }
}

/// Newest first by `created_at`; ties broken by id so output is stable
/// across runs.
fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
