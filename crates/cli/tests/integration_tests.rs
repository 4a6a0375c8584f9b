//! End-to-end tests that drive the REPL binary over stdin, the way a user
//! (or a script) would, with storage pointed at a temp directory.

use std::path::Path;
use tempfile::tempdir;

/// Runs the CLI with the given stdin script and returns captured stdout.
fn run_cli(root: &Path, segment_kb: &str, script: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new("cargo")
        .args(["run", "-p", "cli", "--quiet", "--"])
        .env("JOTLOG_ROOT", root.to_str().unwrap())
        .env("JOTLOG_SEGMENT_KB", segment_kb)
        .env("JOTLOG_CACHE_CAP", "64")
        .env("JOTLOG_FULLTEXT", "true")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn CLI");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin
            .write_all(script.as_bytes())
            .expect("failed to write script");
        stdin.write_all(b"EXIT\n").expect("failed to write EXIT");
    }

    let output = child.wait_with_output().expect("failed to read output");
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Extracts the id printed by a NEW command: the first line after the
/// prompt that looks like a bare 32-char hex token.
fn first_id(output: &str) -> String {
    output
        .lines()
        .map(|l| l.trim_start_matches("> ").trim())
        .find(|l| l.len() == 32 && l.bytes().all(|b| b.is_ascii_hexdigit()))
        .expect("no note id in output")
        .to_string()
}

#[test]
fn create_and_get_round_trip() {
    let dir = tempdir().unwrap();

    let out = run_cli(dir.path(), "8192", "NEW Shopping | milk and eggs | home\n");
    let id = first_id(&out);

    let out = run_cli(dir.path(), "8192", &format!("GET {id}\n"));
    assert!(out.contains("Shopping"));
    assert!(out.contains("milk and eggs"));
    assert!(out.contains("tags: home"));
}

#[test]
fn edit_rewrites_note_in_place() {
    let dir = tempdir().unwrap();

    let out = run_cli(dir.path(), "8192", "NEW Draft | first version\n");
    let id = first_id(&out);

    let script = format!("EDIT {id} Final | second version\nGET {id}\nLIST\n");
    let out = run_cli(dir.path(), "8192", &script);

    assert!(out.contains("Final"));
    assert!(out.contains("second version"));
    assert!(!out.contains("first version"));
    assert!(out.contains("(1 notes)"));
}

#[test]
fn delete_hides_note_from_get_and_list() {
    let dir = tempdir().unwrap();

    let out = run_cli(dir.path(), "8192", "NEW Doomed | bye\n");
    let id = first_id(&out);

    let script = format!("DEL {id}\nGET {id}\nLIST\n");
    let out = run_cli(dir.path(), "8192", &script);

    assert!(out.contains("OK"));
    assert!(out.contains("(not found)"));
    assert!(out.contains("(empty)"));
}

#[test]
fn list_filters_by_tag_and_substring() {
    let dir = tempdir().unwrap();

    let script = "NEW Alpha | about storage | x\nNEW Beta | about gardening | y\n\
                  LIST tag=x\nLIST contains=garden\nLIST tag=x contains=garden\n";
    let out = run_cli(dir.path(), "8192", script);

    // tag=x finds only Alpha, contains=garden only Beta, both together none.
    assert!(out.contains("Alpha"));
    assert!(out.contains("Beta"));
    assert!(out.contains("(empty)"));
}

#[test]
fn notes_survive_restart_and_rotation() {
    let dir = tempdir().unwrap();

    // 1 KiB segments: a handful of notes forces several rotations.
    let mut script = String::new();
    for i in 0..20 {
        script.push_str(&format!(
            "NEW Note {i} | {} | bulk\n",
            "filler text ".repeat(10)
        ));
    }
    run_cli(dir.path(), "1", &script);

    let segments = std::fs::read_dir(dir.path().join("segments")).unwrap().count();
    assert!(segments > 1, "expected rotation to produce several segments");

    // A fresh process sees all 20 notes.
    let out = run_cli(dir.path(), "1", "LIST tag=bulk\n");
    assert!(out.contains("(20 notes)"));
}

#[test]
fn search_works_across_restarts() {
    let dir = tempdir().unwrap();

    run_cli(dir.path(), "8192", "NEW Recipe | tomato soup with basil | food\n");
    let out = run_cli(dir.path(), "8192", "LIST contains=basil\n");

    assert!(out.contains("Recipe"));
    assert!(out.contains("(1 notes)"));
}

#[test]
fn unknown_command_reports_and_continues() {
    let dir = tempdir().unwrap();
    let out = run_cli(dir.path(), "8192", "FROB x\nNEW Still works | yes\n");

    assert!(out.contains("unknown command: FROB"));
    assert!(out.contains("bye"));
}

#[test]
fn stats_prints_store_debug_info() {
    let dir = tempdir().unwrap();
    let out = run_cli(dir.path(), "8192", "NEW One | note\nSTATS\n");

    assert!(out.contains("Store"));
    assert!(out.contains("next_segment_seq"));
}
