//! # Fulltext — search accelerator contract
//!
//! The store talks to full-text search through the narrow [`TextIndex`]
//! contract: `index`, `remove`, `search`, `close`. Every operation is
//! fallible and none is authoritative: the segment log always has the final
//! word, and the store degrades to a full scan whenever the index errors or
//! comes up empty.
//!
//! [`FileIndex`] is the default implementation: a token-based inverted index
//! persisted as JSON under the storage root, with a small LRU cache over
//! search results that is invalidated on every mutation.

use cache::LruCache;
use model::Note;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the index file within the storage root.
pub const INDEX_FILENAME: &str = "index.json";

/// Hit count used when a caller passes a zero search limit.
const DEFAULT_SEARCH_LIMIT: usize = 1000;

/// Capacity of the search-result cache.
const RESULT_CACHE_CAPACITY: usize = 1024;

/// Errors from index operations. The store logs these and keeps going.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("index file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The accelerator contract the store composes against.
///
/// Implementations may lag the log or lose state entirely; the store treats
/// a failed or empty answer as "don't know" and falls back to scanning.
pub trait TextIndex {
    /// Adds or replaces the document for `note.id`.
    fn index(&mut self, note: &Note) -> Result<(), IndexError>;

    /// Drops the document for `id` (no-op if absent).
    fn remove(&mut self, id: &str) -> Result<(), IndexError>;

    /// Returns ids of notes matching every token of `query`, at most
    /// `limit` of them (`0` means a generous default).
    fn search(&mut self, query: &str, limit: usize) -> Result<Vec<String>, IndexError>;

    /// Releases resources; further calls are undefined.
    fn close(&mut self) -> Result<(), IndexError>;
}

/// Splits `text` into lowercase alphanumeric tokens.
///
/// Anything that is not a letter or digit separates tokens, so `"CLI-notes,
/// v2"` becomes `["cli", "notes", "v2"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    /// Document id -> the token set it was last indexed with.
    docs: BTreeMap<String, BTreeSet<String>>,
}

/// JSON-file-backed inverted index.
///
/// The persisted form maps each document id to its token set; the
/// token -> ids postings are rebuilt on load. The file is rewritten
/// atomically (tmp + rename) on every mutation, so a crash can only cost
/// index freshness, never store correctness.
pub struct FileIndex {
    path: PathBuf,
    docs: BTreeMap<String, BTreeSet<String>>,
    postings: BTreeMap<String, BTreeSet<String>>,
    results: LruCache<Vec<String>>,
}

impl FileIndex {
    /// Opens (or starts) the index persisted at `root/index.json`.
    ///
    /// A corrupt index file is an error here; the store handles it by
    /// running without the accelerator.
    pub fn open(root: &Path) -> Result<Self, IndexError> {
        let path = root.join(INDEX_FILENAME);
        let docs = if path.exists() {
            let file: IndexFile = serde_json::from_reader(File::open(&path)?)?;
            file.docs
        } else {
            BTreeMap::new()
        };

        let mut postings: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (id, tokens) in &docs {
            for tok in tokens {
                postings.entry(tok.clone()).or_default().insert(id.clone());
            }
        }

        Ok(Self {
            path,
            docs,
            postings,
            results: LruCache::new(RESULT_CACHE_CAPACITY),
        })
    }

    fn detach_doc(&mut self, id: &str) {
        let Some(tokens) = self.docs.remove(id) else {
            return;
        };
        for tok in tokens {
            if let Some(ids) = self.postings.get_mut(&tok) {
                ids.remove(id);
                if ids.is_empty() {
                    self.postings.remove(&tok);
                }
            }
        }
    }

    fn save(&self) -> Result<(), IndexError> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            let file = IndexFile {
                version: 1,
                docs: self.docs.clone(),
            };
            serde_json::to_writer(&mut f, &file)?;
            f.flush()?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TextIndex for FileIndex {
    fn index(&mut self, note: &Note) -> Result<(), IndexError> {
        self.detach_doc(&note.id);

        let mut tokens: BTreeSet<String> = BTreeSet::new();
        tokens.extend(tokenize(&note.title));
        tokens.extend(tokenize(&note.body));
        for tag in &note.tags {
            tokens.extend(tokenize(tag));
        }

        for tok in &tokens {
            self.postings
                .entry(tok.clone())
                .or_default()
                .insert(note.id.clone());
        }
        self.docs.insert(note.id.clone(), tokens);

        self.results.clear();
        self.save()
    }

    fn remove(&mut self, id: &str) -> Result<(), IndexError> {
        if !self.docs.contains_key(id) {
            return Ok(());
        }
        self.detach_doc(id);
        self.results.clear();
        self.save()
    }

    fn search(&mut self, query: &str, limit: usize) -> Result<Vec<String>, IndexError> {
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
        let key = format!("{query}|{limit}");
        if let Some(hit) = self.results.get(&key) {
            return Ok(hit.clone());
        }

        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        // Conjunctive match: intersect the postings of every query token.
        let mut ids: Option<BTreeSet<String>> = None;
        for tok in &tokens {
            let posting = self.postings.get(tok).cloned().unwrap_or_default();
            ids = Some(match ids {
                None => posting,
                Some(acc) => acc.intersection(&posting).cloned().collect(),
            });
            if ids.as_ref().is_some_and(|s| s.is_empty()) {
                break;
            }
        }

        let out: Vec<String> = ids.unwrap_or_default().into_iter().take(limit).collect();
        self.results.put(key, out.clone());
        Ok(out)
    }

    fn close(&mut self) -> Result<(), IndexError> {
        self.save()
    }
}
