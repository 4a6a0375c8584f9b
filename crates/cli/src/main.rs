//! # CLI - Jotlog Interactive Shell
//!
//! A REPL-style command-line interface for the Jotlog note store. Reads
//! commands from stdin, executes them against the store, and prints results
//! to stdout. Designed for both interactive use and scripted testing (pipe
//! commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! NEW <title> | <body> [| tag,tag]    Create a note, prints its id
//! GET <id>                            Print one note
//! EDIT <id> <title> | <body> [| tags] Rewrite a note (same id, created_at kept)
//! DEL <id>                            Delete a note (appends a tombstone)
//! LIST [tag=x] [contains=y] [limit=n] List live notes, newest first
//! IMPORT <dir> [dry]                  Import markdown/text files
//! STATS                               Print store debug info
//! EXIT / QUIT                         Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! JOTLOG_ROOT        storage root directory       (default: ~/.jotlog)
//! JOTLOG_SEGMENT_KB  segment size cap in KiB      (default: 8192 = 8 MiB)
//! JOTLOG_CACHE_CAP   recency cache entries        (default: 4096)
//! JOTLOG_FULLTEXT    full-text accelerator on/off (default: "true")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! jotlog started (root=/home/me/.jotlog, segment=8192KiB, cache=4096, fulltext=true)
//! > NEW Shopping | milk and eggs | home
//! 3f2a9c...
//! > LIST tag=home
//! [3f2a9c...] Shopping
//! > EXIT
//! bye
//! ```

mod import;

use anyhow::Result;
use config::StoreOptions;
use model::Note;
use std::io::{self, BufRead, Write};
use store::{Filter, Store, StoreError};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let options = StoreOptions::from_env();
    println!(
        "jotlog started (root={}, segment={}KiB, cache={}, fulltext={})",
        options.root.display(),
        options.segment_size_bytes / 1024,
        options.cache_capacity,
        options.fulltext
    );
    let mut store = Store::open(options)?;

    println!("Commands: NEW title | body [| tags] | GET id | EDIT id title | body [| tags]");
    println!("          DEL id | LIST [tag=x] [contains=y] [limit=n] | IMPORT dir [dry]");
    println!("          STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match cmd.to_uppercase().as_str() {
            "" => {}
            "NEW" => match parse_fields(rest) {
                Some((title, body, tags)) => {
                    let note = Note::new(title, body, tags);
                    match store.append(&note) {
                        Ok(()) => println!("{}", note.id),
                        Err(e) => println!("ERR create failed: {}", e),
                    }
                }
                None => println!("ERR usage: NEW title | body [| tag,tag]"),
            },
            "GET" => {
                if rest.is_empty() {
                    println!("ERR usage: GET id");
                } else {
                    match store.get_by_id(rest) {
                        Ok(n) => print_note(&n),
                        Err(StoreError::NotFound) => println!("(not found)"),
                        Err(e) => println!("ERR read failed: {}", e),
                    }
                }
            }
            "EDIT" => {
                let mut sub = rest.splitn(2, char::is_whitespace);
                let id = sub.next().unwrap_or("");
                let fields = sub.next().unwrap_or("").trim();
                match (id.is_empty(), parse_fields(fields)) {
                    (false, Some((title, body, tags))) => match store.get_by_id(id) {
                        Ok(old) => {
                            let next = old.updated(title, body, tags);
                            match store.append(&next) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR edit failed: {}", e),
                            }
                        }
                        Err(StoreError::NotFound) => println!("(not found)"),
                        Err(e) => println!("ERR read failed: {}", e),
                    },
                    _ => println!("ERR usage: EDIT id title | body [| tags]"),
                }
            }
            "DEL" => {
                if rest.is_empty() {
                    println!("ERR usage: DEL id");
                } else {
                    match store.get_by_id(rest) {
                        Ok(n) => match store.append(&n.tombstone()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR delete failed: {}", e),
                        },
                        Err(StoreError::NotFound) => println!("(not found)"),
                        Err(e) => println!("ERR read failed: {}", e),
                    }
                }
            }
            "LIST" => match parse_filter(rest) {
                Some(filter) => match store.list(&filter) {
                    Ok(notes) => {
                        if notes.is_empty() {
                            println!("(empty)");
                        } else {
                            for n in &notes {
                                print_note_line(n);
                            }
                            println!("({} notes)", notes.len());
                        }
                    }
                    Err(e) => println!("ERR list failed: {}", e),
                },
                None => println!("ERR usage: LIST [tag=x] [contains=y] [limit=n]"),
            },
            "IMPORT" => {
                let mut sub = rest.split_whitespace();
                match sub.next() {
                    Some(dir) => {
                        let dry_run = sub.next() == Some("dry");
                        match import::import_dir(&mut store, std::path::Path::new(dir), dry_run) {
                            Ok(report) => println!(
                                "{} files: {} created, {} updated, {} skipped, {} errors{}",
                                report.total_files,
                                report.created,
                                report.updated,
                                report.skipped,
                                report.errors,
                                if dry_run { " (dry run)" } else { "" }
                            ),
                            Err(e) => println!("ERR import failed: {}", e),
                        }
                    }
                    None => println!("ERR usage: IMPORT dir [dry]"),
                }
            }
            "STATS" => {
                println!("{:?}", store);
            }
            "EXIT" | "QUIT" => {
                println!("bye");
                break;
            }
            other => {
                println!("unknown command: {}", other);
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    store.close()?;
    Ok(())
}

/// Parses `title | body [| tag,tag]` into its three parts.
fn parse_fields(input: &str) -> Option<(String, String, Vec<String>)> {
    if input.is_empty() {
        return None;
    }
    let mut parts = input.splitn(3, '|');
    let title = parts.next()?.trim().to_string();
    let body = parts.next().map(|s| s.trim().to_string()).unwrap_or_default();
    let tags = parts
        .next()
        .map(|s| parse_tags(s))
        .unwrap_or_default();
    if title.is_empty() && body.is_empty() {
        return None;
    }
    Some((title, body, tags))
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Parses `[tag=x] [contains=y] [limit=n]` into a [`Filter`].
fn parse_filter(input: &str) -> Option<Filter> {
    let mut filter = Filter::default();
    for word in input.split_whitespace() {
        match word.split_once('=') {
            Some(("tag", v)) => filter.tag = Some(v.to_string()),
            Some(("contains", v)) => filter.contains = Some(v.to_string()),
            Some(("limit", v)) => filter.limit = v.parse().ok()?,
            _ => return None,
        }
    }
    Some(filter)
}

fn print_note(n: &Note) {
    println!("[{}] {}", n.id, n.title);
    if !n.tags.is_empty() {
        println!("  tags: {}", n.tags.join(", "));
    }
    println!("  created: {}", n.created_at.format("%Y-%m-%d %H:%M:%S"));
    if n.updated_at != n.created_at {
        println!("  updated: {}", n.updated_at.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("  ---");
    println!("{}", n.body);
}

fn print_note_line(n: &Note) {
    if n.title.is_empty() {
        println!("[{}]", n.id);
    } else {
        println!("[{}] {}", n.id, n.title);
    }
    if !n.tags.is_empty() {
        println!("  tags: {}", n.tags.join(", "));
    }
    println!("  created: {}", n.created_at.format("%Y-%m-%d %H:%M:%S"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fields_splits_on_pipes() {
        let (title, body, tags) = parse_fields("Shopping | milk and eggs | home,errands").unwrap();
        assert_eq!(title, "Shopping");
        assert_eq!(body, "milk and eggs");
        assert_eq!(tags, vec!["home".to_string(), "errands".to_string()]);
    }

    #[test]
    fn parse_fields_tags_optional() {
        let (title, body, tags) = parse_fields("Title only | some body").unwrap();
        assert_eq!(title, "Title only");
        assert_eq!(body, "some body");
        assert!(tags.is_empty());
    }

    #[test]
    fn parse_fields_rejects_empty() {
        assert!(parse_fields("").is_none());
        assert!(parse_fields(" | ").is_none());
    }

    #[test]
    fn parse_filter_handles_all_keys() {
        let f = parse_filter("tag=work contains=rust limit=5").unwrap();
        assert_eq!(f.tag.as_deref(), Some("work"));
        assert_eq!(f.contains.as_deref(), Some("rust"));
        assert_eq!(f.limit, 5);
    }

    #[test]
    fn parse_filter_empty_is_unfiltered() {
        let f = parse_filter("").unwrap();
        assert!(f.tag.is_none());
        assert!(f.contains.is_none());
        assert_eq!(f.limit, 0);
    }

    #[test]
    fn parse_filter_rejects_unknown_keys() {
        assert!(parse_filter("bogus=1").is_none());
        assert!(parse_filter("limit=notanumber").is_none());
    }
}
