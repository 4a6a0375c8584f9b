use super::helpers::options;
use crate::manifest::{Manifest, MANIFEST_FILENAME};
use crate::{Store, StoreError, SEGMENTS_DIRNAME};
use tempfile::tempdir;

#[test]
fn ensure_creates_layout_and_defaults() {
    let dir = tempdir().unwrap();
    Manifest::ensure(dir.path(), 8 * 1024 * 1024).unwrap();

    assert!(dir.path().join(SEGMENTS_DIRNAME).is_dir());
    assert!(dir.path().join(MANIFEST_FILENAME).is_file());

    let man = Manifest::open(dir.path()).unwrap();
    assert_eq!(man.version, 1);
    assert_eq!(man.segment_size_bytes, 8 * 1024 * 1024);
    assert_eq!(man.next_segment_seq, 1);
    assert!(man.created_at_unix > 0);
}

#[test]
fn ensure_never_overwrites_existing_manifest() {
    let dir = tempdir().unwrap();
    crate::ensure(dir.path(), 1111).unwrap();
    crate::ensure(dir.path(), 2222).unwrap();

    let man = Manifest::open(dir.path()).unwrap();
    assert_eq!(man.segment_size_bytes, 1111);
}

#[test]
fn save_then_open_round_trips() {
    let dir = tempdir().unwrap();
    Manifest::ensure(dir.path(), 4096).unwrap();

    let mut man = Manifest::open(dir.path()).unwrap();
    man.next_segment_seq = 7;
    man.save(dir.path()).unwrap();

    assert_eq!(Manifest::open(dir.path()).unwrap(), man);
}

#[test]
fn missing_manifest_is_fatal() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        Manifest::open(dir.path()),
        Err(StoreError::Manifest(_))
    ));
}

#[test]
fn corrupt_manifest_fails_store_open() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(SEGMENTS_DIRNAME)).unwrap();
    std::fs::write(dir.path().join(MANIFEST_FILENAME), b"{not json").unwrap();

    let err = Store::open_with_index(options(dir.path()), None).unwrap_err();
    assert!(matches!(err, StoreError::Manifest(_)));
}

#[test]
fn unsupported_manifest_version_fails_open() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(SEGMENTS_DIRNAME)).unwrap();
    std::fs::write(
        dir.path().join(MANIFEST_FILENAME),
        br#"{"version":99,"segment_size_bytes":1024,"next_segment_seq":1,"created_at_unix":1}"#,
    )
    .unwrap();

    assert!(matches!(
        Manifest::open(dir.path()),
        Err(StoreError::Manifest(_))
    ));
}

#[test]
fn store_open_uses_manifest_threshold_not_options() {
    let dir = tempdir().unwrap();

    // First open writes the manifest with a tiny threshold.
    {
        let mut opts = options(dir.path());
        opts.segment_size_bytes = 16;
        Store::open_with_index(opts, None).unwrap();
    }

    // Reopening with a huge option value must not change rotation policy:
    // the persisted manifest governs.
    let mut opts = options(dir.path());
    opts.segment_size_bytes = u64::MAX;
    let mut s = Store::open_with_index(opts, None).unwrap();

    s.append(&super::helpers::note("a", "", &[])).unwrap();
    s.append(&super::helpers::note("b", "", &[])).unwrap();
    assert_eq!(s.active_segment_seq(), 2);
}
