//! Markdown importer: a client of the store façade.
//!
//! Walks a directory for markdown/text files, parses optional `---` front
//! matter, and appends the results as notes through the store's public API
//! only. An `imports.json` source index at the storage root (source key →
//! note id + content hash) makes re-imports idempotent: unchanged files are
//! skipped, changed files become updates that keep their note id and
//! `created_at`.
//!
//! Recognized front matter keys: `id`, `title`, `tags`, `created`,
//! `updated`. Files without front matter import with an empty title and the
//! whole content as body.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use model::Note;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use store::{Store, StoreError};
use walkdir::WalkDir;

/// Importer source index, kept at the storage root.
pub const IMPORT_INDEX_FILENAME: &str = "imports.json";

/// Extensions the importer picks up.
const EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Outcome summary of one import run.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub total_files: usize,
    pub parsed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub results: Vec<FileResult>,
}

/// Per-file outcome.
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub path: String,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourceInfo {
    note_id: String,
    path: String,
    content_hash: String,
    mod_time_unix: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImportIndex {
    version: u32,
    sources: BTreeMap<String, SourceInfo>,
}

impl Default for ImportIndex {
    fn default() -> Self {
        Self {
            version: 1,
            sources: BTreeMap::new(),
        }
    }
}

/// Imports every matching file under `dir` into `store`.
///
/// With `dry_run`, nothing is appended and the source index is left
/// untouched; the report shows what would happen. Per-file problems are
/// recorded in the report rather than aborting the run.
pub fn import_dir(store: &mut Store, dir: &Path, dry_run: bool) -> Result<Report> {
    anyhow::ensure!(dir.is_dir(), "import source {} is not a directory", dir.display());

    let root = store.root().to_path_buf();
    let mut index = load_index(&root);
    let mut report = Report::default();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let matches_ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !matches_ext {
            continue;
        }

        report.total_files += 1;
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();

        if let Err(e) = import_file(store, &mut index, &mut report, entry.path(), &rel, dry_run) {
            tracing::warn!(path = %rel, error = %e, "import failed for file");
            report.errors += 1;
            report.results.push(FileResult {
                path: rel,
                action: "error",
                error: Some(e.to_string()),
            });
        }
    }

    if !dry_run {
        save_index(&root, &index)?;
    }
    Ok(report)
}

fn import_file(
    store: &mut Store,
    index: &mut ImportIndex,
    report: &mut Report,
    path: &Path,
    rel: &str,
    dry_run: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mod_time_unix = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or_else(|| Utc::now().timestamp());

    let (meta, body) = split_front_matter(&content);
    let title = meta.get("title").cloned().unwrap_or_default();
    let tags = meta.get("tags").map(|t| parse_tags(t)).unwrap_or_default();
    let created_meta = meta.get("created").and_then(|v| parse_time_flexible(v));
    let updated_meta = meta.get("updated").and_then(|v| parse_time_flexible(v));
    report.parsed += 1;

    let source_key = match meta.get("id").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(id) => format!("id:{id}"),
        None => format!("path:{rel}"),
    };
    let content_hash = hash_content(&title, &tags, body);

    // Unchanged since the last run: nothing to append.
    if let Some(entry) = index.sources.get(&source_key) {
        if entry.content_hash == content_hash {
            report.skipped += 1;
            report.results.push(FileResult {
                path: rel.to_string(),
                action: "skipped",
                error: None,
            });
            if !dry_run {
                let mut entry = entry.clone();
                entry.path = rel.to_string();
                entry.mod_time_unix = mod_time_unix;
                index.sources.insert(source_key, entry);
            }
            return Ok(());
        }
    }

    // Changed content for a known source becomes an update when the note is
    // still live; otherwise (first sighting, or note since deleted) a fresh
    // note is created.
    let previous = match index.sources.get(&source_key) {
        Some(entry) => match store.get_by_id(&entry.note_id) {
            Ok(old) => Some(old),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let (note, action) = match previous {
        Some(old) => {
            let mut next = old.updated(title, body.to_string(), tags);
            if let Some(created) = created_meta {
                next.created_at = created;
            }
            if let Some(updated) = updated_meta {
                next.updated_at = updated;
            }
            (next, "updated")
        }
        None => {
            let mut note = Note::new(title, body.to_string(), tags);
            if let Some(created) = created_meta {
                note.created_at = created;
                note.updated_at = created;
            }
            if let Some(updated) = updated_meta {
                note.updated_at = updated;
            }
            (note, "created")
        }
    };

    if !dry_run {
        store.append(&note)?;
        index.sources.insert(
            source_key,
            SourceInfo {
                note_id: note.id.clone(),
                path: rel.to_string(),
                content_hash,
                mod_time_unix,
            },
        );
    }

    match action {
        "updated" => report.updated += 1,
        _ => report.created += 1,
    }
    report.results.push(FileResult {
        path: rel.to_string(),
        action,
        error: None,
    });
    Ok(())
}

fn hash_content(title: &str, tags: &[String], body: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(tags.join(",").as_bytes());
    hasher.update(b"\n");
    hasher.update(body.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn load_index(root: &Path) -> ImportIndex {
    let path = root.join(IMPORT_INDEX_FILENAME);
    // Missing or unreadable index just means every source looks new.
    std::fs::read(&path)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

fn save_index(root: &Path, index: &ImportIndex) -> Result<()> {
    let path = root.join(IMPORT_INDEX_FILENAME);
    let bytes = serde_json::to_vec_pretty(index)?;
    std::fs::write(&path, bytes).with_context(|| format!("cannot write {}", path.display()))
}

/// Splits optional `---` front matter off `content`, returning lowercased
/// key/value metadata and the remaining body.
fn split_front_matter(content: &str) -> (BTreeMap<String, String>, &str) {
    let mut meta = BTreeMap::new();

    let Some(rest) = content.strip_prefix("---") else {
        return (meta, content);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (meta, content);
    };
    let Some(end) = rest.find("\n---") else {
        return (meta, content);
    };

    for line in rest[..end].lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            meta.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let body = &rest[end + 4..];
    let body = body.strip_prefix('\n').or_else(|| body.strip_prefix("\r\n")).unwrap_or(body);
    (meta, body)
}

fn parse_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    raw.split(',')
        .map(|t| t.trim().trim_matches('"'))
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Accepts RFC 3339 plus a few human date formats.
fn parse_time_flexible(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&t));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    None
}
