//! # Segment — append-only record log
//!
//! Provides the durable journal for the Jotlog store: an ordered set of
//! append-only NDJSON files, each holding a contiguous slice of the note
//! version history.
//!
//! ## Record Format
//!
//! One JSON object per line, each the full serialized note version (not a
//! diff), self-delimited by `\n`:
//!
//! ```text
//! {"id":"...","title":"...","body":"...","tags":[...],"created_at":...,"updated_at":...,"deleted":false}
//! ```
//!
//! ## Naming
//!
//! Segments are named `notes-<8-digit-zero-padded-seq>.ndjson` so that
//! lexicographic filename order equals sequence order. Global version order
//! is (segment sequence, position within segment); the read path relies on
//! this to resolve "latest version wins".
//!
//! ## Failure Semantics
//!
//! A malformed or partially-written trailing line (process killed mid-write)
//! is skipped during [`replay`] without aborting the rest of the scan;
//! corruption is contained to the single bad record.

use model::Note;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filename prefix for segment files.
pub const SEGMENT_PREFIX: &str = "notes-";
/// Filename extension for segment files.
pub const SEGMENT_SUFFIX: &str = ".ndjson";

/// Errors from segment I/O.
///
/// Unparsable lines encountered during replay are *not* errors; they are
/// skipped and counted. Only real I/O and encoding failures surface here.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A note could not be serialized for append.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Builds the filename for segment `seq`: `notes-00000042.ndjson`.
pub fn segment_file_name(seq: u32) -> String {
    format!("{SEGMENT_PREFIX}{seq:08}{SEGMENT_SUFFIX}")
}

/// Parses the sequence number out of a segment filename, or `None` if the
/// name does not follow the segment naming scheme.
pub fn parse_segment_seq(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(SEGMENT_PREFIX)?.strip_suffix(SEGMENT_SUFFIX)?;
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lists segment files in `dir`, sorted ascending by sequence.
///
/// Files that do not match the naming scheme are ignored. A missing
/// directory yields an empty list.
pub fn list_segments(dir: &Path) -> Result<Vec<PathBuf>, SegmentError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SegmentError::Io(e)),
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_segment_seq)
                .is_some()
        })
        .collect();

    // Fixed-width zero-padded names: lexicographic order == sequence order.
    paths.sort();
    Ok(paths)
}

/// Returns the number of bytes `note` will occupy in a segment, including
/// the line terminator. Used by the store to decide rotation *before*
/// writing.
pub fn encoded_len(note: &Note) -> Result<u64, SegmentError> {
    Ok(serde_json::to_vec(note)?.len() as u64 + 1)
}

/// Append-only writer for the active segment.
///
/// Each record is serialized into a buffer and written with a single
/// `write_all` followed by `flush`, so a crash can at worst leave one
/// partial trailing line, which [`replay`] skips.
pub struct SegmentWriter {
    file: File,
    path: PathBuf,
    seq: u32,
    size: u64,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl SegmentWriter {
    /// Opens (or creates) the segment at `path` in append mode, recording
    /// its current on-disk size for rotation accounting.
    pub fn open<P: AsRef<Path>>(path: P, seq: u32) -> Result<Self, SegmentError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            path,
            seq,
            size,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `note` as one NDJSON line and appends it.
    ///
    /// Returns the number of bytes written. The threshold check is the
    /// caller's job ([`would_exceed`](Self::would_exceed)); an oversized
    /// record is always written in full, never truncated or split.
    pub fn append(&mut self, note: &Note) -> Result<u64, SegmentError> {
        self.buf.clear();
        serde_json::to_writer(&mut self.buf, note)?;
        self.buf.push(b'\n');

        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        let n = self.buf.len() as u64;
        self.size += n;
        Ok(n)
    }

    /// Whether appending `extra` more bytes would push a *non-empty* segment
    /// past `threshold`. An empty segment never reports true: an oversized
    /// record still gets its own segment rather than an orphaned empty one.
    pub fn would_exceed(&self, extra: u64, threshold: u64) -> bool {
        self.size > 0 && self.size + extra > threshold
    }

    /// Forces buffered data to disk via `sync_all`.
    pub fn sync(&mut self) -> Result<(), SegmentError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Sequence number of this segment.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Current size of this segment in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of this segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replays every parsable record in the segment at `path`, in append order,
/// calling `apply` for each one.
///
/// Returns the number of lines that were skipped because they could not be
/// parsed (truncated tail, corruption, invalid UTF-8). The caller decides
/// whether skipped lines are worth reporting.
pub fn replay<P, F>(path: P, mut apply: F) -> Result<usize, SegmentError>
where
    P: AsRef<Path>,
    F: FnMut(Note),
{
    let file = File::open(path.as_ref())?;
    let mut rdr = BufReader::new(file);
    let mut line = Vec::with_capacity(1024);
    let mut skipped = 0usize;

    loop {
        line.clear();
        let n = rdr.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Ok(skipped);
        }

        let trimmed = trim_line(&line);
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_slice::<Note>(trimmed) {
            Ok(note) => apply(note),
            // Contained corruption: skip this line, keep scanning.
            Err(_) => skipped += 1,
        }
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}
