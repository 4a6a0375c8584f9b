//! Note record model.
//!
//! A [`Note`] is the unit of data in the log: immutable once written, with
//! every edit or deletion appended as a *new version* carrying the same `id`.
//! The latest version in append order is the note's current state; a version
//! with `deleted == true` is a tombstone that makes the id unreachable
//! through the read path without erasing its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One version of a note, serialized as a single JSON object per segment line.
///
/// Field contract across versions of the same id:
///
/// * `id` is assigned once at first creation and never reused for a
///   different logical note.
/// * `created_at` is the timestamp of the *first* version and must be
///   carried forward unchanged by updates and tombstones.
/// * `updated_at` is the timestamp of *this* version.
/// * `tags` keep their insertion order and are compared by exact string
///   equality; duplicates are not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

impl Note {
    /// Creates the first version of a new note with a fresh opaque id and
    /// `created_at == updated_at == now`.
    pub fn new(title: impl Into<String>, body: impl Into<String>, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            title: title.into(),
            body: body.into(),
            tags,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    /// Derives an updated version: same id and `created_at`, new content,
    /// fresh `updated_at`.
    pub fn updated(&self, title: impl Into<String>, body: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: self.id.clone(),
            title: title.into(),
            body: body.into(),
            tags,
            created_at: self.created_at,
            updated_at: Utc::now(),
            deleted: false,
        }
    }

    /// Derives a tombstone version: same id and `created_at`, fresh
    /// `updated_at`, `deleted` set.
    pub fn tombstone(&self) -> Self {
        let mut t = self.clone();
        t.updated_at = Utc::now();
        t.deleted = true;
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_has_fresh_id_and_equal_timestamps() {
        let a = Note::new("A", "body", vec!["x".into()]);
        let b = Note::new("A", "body", vec!["x".into()]);

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert!(!a.deleted);
    }

    #[test]
    fn tombstone_preserves_id_and_created_at() {
        let n = Note::new("T", "b", vec![]);
        let t = n.tombstone();

        assert!(t.deleted);
        assert_eq!(t.id, n.id);
        assert_eq!(t.created_at, n.created_at);
        assert!(t.updated_at >= n.updated_at);
    }

    #[test]
    fn updated_preserves_created_at() {
        let n = Note::new("old", "b", vec!["a".into()]);
        let u = n.updated("new", "b2", vec!["b".into()]);

        assert_eq!(u.id, n.id);
        assert_eq!(u.created_at, n.created_at);
        assert_eq!(u.title, "new");
        assert_eq!(u.tags, vec!["b".to_string()]);
        assert!(!u.deleted);
    }

    #[test]
    fn json_round_trip() {
        let n = Note::new("Title", "Body text", vec!["go".into(), "cli".into()]);
        let line = serde_json::to_string(&n).unwrap();
        let back: Note = serde_json::from_str(&line).unwrap();

        assert_eq!(back, n);
    }

    #[test]
    fn missing_optional_fields_default() {
        // Records written by older builds may omit tags / deleted.
        let line = r#"{"id":"abc","title":"t","body":"b",
            "created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#;
        let n: Note = serde_json::from_str(line).unwrap();

        assert!(n.tags.is_empty());
        assert!(!n.deleted);
    }
}
