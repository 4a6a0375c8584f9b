use crate::Store;
use config::StoreOptions;
use fulltext::{IndexError, TextIndex};
use model::Note;
use std::path::Path;

pub fn options(root: &Path) -> StoreOptions {
    StoreOptions {
        root: root.to_path_buf(),
        segment_size_bytes: 1024 * 1024,
        cache_capacity: 64,
        fulltext: false,
    }
}

/// Opens a store with no search accelerator, so reads exercise the cache
/// and scan paths directly.
pub fn open_plain(root: &Path) -> Store {
    Store::open_with_index(options(root), None).unwrap()
}

pub fn note(title: &str, body: &str, tags: &[&str]) -> Note {
    Note::new(title, body, tags.iter().map(|t| t.to_string()).collect())
}

/// An accelerator that fails every call. Used to prove that index trouble
/// never surfaces through store operations.
pub struct FailingIndex;

impl TextIndex for FailingIndex {
    fn index(&mut self, _note: &Note) -> Result<(), IndexError> {
        Err(broken())
    }
    fn remove(&mut self, _id: &str) -> Result<(), IndexError> {
        Err(broken())
    }
    fn search(&mut self, _query: &str, _limit: usize) -> Result<Vec<String>, IndexError> {
        Err(broken())
    }
    fn close(&mut self) -> Result<(), IndexError> {
        Err(broken())
    }
}

/// An accelerator that answers every search with a fixed id list,
/// regardless of what was indexed. Used to exercise stale-index handling.
pub struct StaticIndex(pub Vec<String>);

impl TextIndex for StaticIndex {
    fn index(&mut self, _note: &Note) -> Result<(), IndexError> {
        Ok(())
    }
    fn remove(&mut self, _id: &str) -> Result<(), IndexError> {
        Ok(())
    }
    fn search(&mut self, _query: &str, _limit: usize) -> Result<Vec<String>, IndexError> {
        Ok(self.0.clone())
    }
    fn close(&mut self) -> Result<(), IndexError> {
        Ok(())
    }
}

fn broken() -> IndexError {
    IndexError::Io(std::io::Error::new(std::io::ErrorKind::Other, "broken"))
}
