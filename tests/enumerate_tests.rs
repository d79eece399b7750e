//! End-to-end enumeration tests over real temporary directories.

use fastdir::{
    begin_enumerate, end_enumerate, enumerate, metadata_supported, read_dir, DirEntry,
    DirHandle, DirReader, Error, FieldSet, FileType,
};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn populate(dir: &Path, count: usize) {
    for i in 0..count {
        fs::write(dir.join(format!("file_{:06}.txt", i)), "x").expect("write file");
    }
}

/// Drain a handle through the `Option`-returning API.
fn list_all(path: &Path, max_items: usize) -> Vec<DirEntry> {
    let mut handle = begin_enumerate(path).expect("open dir");
    let mut all = Vec::new();
    while let Some(batch) = enumerate(&mut handle, max_items, None, false) {
        all.extend(batch);
    }
    end_enumerate(handle);
    all
}

fn names(entries: &[DirEntry]) -> HashSet<OsString> {
    entries.iter().map(|e| e.name().to_owned()).collect()
}

#[test]
fn test_every_entry_exactly_once() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 300);

    let entries = list_all(dir.path(), 64);
    let unique = names(&entries);

    assert_eq!(entries.len(), 300, "no duplicates");
    assert_eq!(unique.len(), 300);
    for i in 0..300 {
        assert!(unique.contains(OsStr::new(&format!("file_{:06}.txt", i))));
    }
}

#[test]
fn test_no_dot_entries() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 3);

    for entry in list_all(dir.path(), 16) {
        assert_ne!(entry.name(), ".");
        assert_ne!(entry.name(), "..");
    }
}

#[test]
fn test_batch_fields_within_supported() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 10);
    fs::create_dir(dir.path().join("sub")).expect("create subdir");

    let supported = metadata_supported();
    for entry in list_all(dir.path(), 4) {
        assert!(
            supported.contains(entry.metadata_ready()),
            "{:?} has fields outside {:?}",
            entry.metadata_ready(),
            supported
        );
    }
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().expect("create temp dir");

    let mut handle = DirHandle::open(dir.path()).expect("open empty dir");
    match handle.next_batch(16, None, false).expect("read") {
        None => {}
        Some(batch) => {
            assert!(batch.is_empty());
            assert!(handle.next_batch(16, None, false).expect("read").is_none());
        }
    }
}

#[test]
fn test_nonexistent_directory() {
    let dir = tempdir().expect("create temp dir");
    let missing = dir.path().join("does/not/exist");

    assert!(begin_enumerate(&missing).is_none());
    match read_dir(&missing) {
        Err(Error::Open(_)) => {} // expected
        Err(e) => panic!("expected Error::Open, got {:?}", e),
        Ok(_) => panic!("expected error, got Ok"),
    }
}

#[test]
fn test_regular_file_is_not_a_directory() {
    let dir = tempdir().expect("create temp dir");
    let file = dir.path().join("plain.txt");
    fs::write(&file, "content").expect("write file");

    assert!(begin_enumerate(&file).is_none());
}

#[test]
fn test_batch_size_one() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 40);

    let mut handle = DirHandle::open(dir.path()).expect("open dir");
    let mut seen = HashSet::new();
    while let Some(batch) = handle.next_batch(1, None, false).expect("read") {
        assert!(batch.len() <= 1);
        seen.extend(batch.into_iter().map(|e| e.name().to_owned()));
    }
    assert_eq!(seen.len(), 40);
}

#[test]
fn test_batch_sizes_agree() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 257);

    let expected = names(&list_all(dir.path(), 10_000));
    for max_items in [2, 3, 17, 256, 257] {
        assert_eq!(names(&list_all(dir.path(), max_items)), expected, "max_items = {max_items}");
    }
}

#[cfg(unix)]
fn listing_with_symlink(count: usize) {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), count);
    std::os::unix::fs::symlink("file_000000.txt", dir.path().join("link")).expect("symlink");

    let mut entries = list_all(dir.path(), 4096);
    assert_eq!(entries.len(), count + 1);
    assert_eq!(names(&entries).len(), count + 1);

    for entry in &mut entries {
        let have = entry.fetch_metadata(dir.path(), FieldSet::TYPE);
        assert!(have.contains(FieldSet::TYPE));
        let expected = if entry.name() == "link" {
            FileType::Symlink
        } else {
            FileType::Regular
        };
        assert_eq!(entry.file_type(), expected, "{:?}", entry.name());
    }
}

#[cfg(unix)]
#[test]
fn test_listing_with_symlink() {
    listing_with_symlink(2_000);
}

#[cfg(unix)]
#[test]
#[ignore = "creates 100,000 files"]
fn test_large_listing_with_symlink() {
    listing_with_symlink(100_000);
}

#[test]
fn test_glob_filter() {
    let dir = tempdir().expect("create temp dir");
    for name in ["alpha.rs", "beta.rs", "gamma.toml", "delta.rs.bak"] {
        fs::write(dir.path().join(name), "").expect("write file");
    }

    let entries = DirReader::new(dir.path())
        .glob("*.rs")
        .read_all()
        .expect("read dir");

    let found = names(&entries);
    let expected: HashSet<OsString> = ["alpha.rs", "beta.rs"].iter().map(OsString::from).collect();
    assert_eq!(found, expected);
}

#[test]
fn test_glob_question_mark() {
    let dir = tempdir().expect("create temp dir");
    for name in ["a1", "a2", "a10", "b1"] {
        fs::write(dir.path().join(name), "").expect("write file");
    }

    let entries = DirReader::new(dir.path()).glob("a?").read_all().expect("read dir");
    let expected: HashSet<OsString> = ["a1", "a2"].iter().map(OsString::from).collect();
    assert_eq!(names(&entries), expected);
}

#[test]
fn test_names_only_still_lists_everything() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 20);

    let entries = DirReader::new(dir.path())
        .names_only(true)
        .batch_size(8)
        .read_all()
        .expect("read dir");
    assert_eq!(entries.len(), 20);
}

#[test]
fn test_unicode_filenames() {
    let dir = tempdir().expect("create temp dir");
    let unicode_name = "日本語ファイル.txt";
    fs::write(dir.path().join(unicode_name), "content").expect("write unicode file");

    let entries: Vec<_> = read_dir(dir.path())
        .expect("open dir")
        .filter_map(|e| e.ok())
        .collect();

    assert!(entries.iter().any(|e| e.name() == unicode_name), "should handle unicode");
}

#[test]
fn test_subdirectories() {
    let dir = tempdir().expect("create temp dir");
    fs::create_dir(dir.path().join("subdir")).expect("create subdir");
    fs::write(dir.path().join("file.txt"), "content").expect("write file");

    let mut entries = DirReader::new(dir.path())
        .prefetch(FieldSet::TYPE)
        .read_all()
        .expect("read dir");

    let subdir = entries.iter_mut().find(|e| e.name() == "subdir").expect("find subdir");
    assert_eq!(subdir.file_type(), FileType::Directory);
    let file = entries.iter_mut().find(|e| e.name() == "file.txt").expect("find file");
    assert_eq!(file.file_type(), FileType::Regular);
}

#[test]
fn test_batches_iterator() {
    let dir = tempdir().expect("create temp dir");
    populate(dir.path(), 50);

    let mut total = 0;
    for batch in DirReader::new(dir.path()).batch_size(16).open().expect("open dir") {
        let batch = batch.expect("read batch");
        assert!(batch.len() <= 16);
        total += batch.len();
    }
    assert_eq!(total, 50);
}

#[test]
fn test_entry_paths_point_into_directory() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("here.txt"), "").expect("write file");

    let entries = DirReader::new(dir.path()).read_all().expect("read dir");
    assert_eq!(entries[0].path(), Some(dir.path().join("here.txt")));
}

#[cfg(unix)]
#[test]
fn test_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("create temp dir");
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).expect("create dir");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");

    // Root bypasses permission checks.
    let result = read_dir(&locked);
    let denied = result.is_err() || result.map_or(false, |mut it| it.any(|e| e.is_err()));
    let is_root = unsafe { libc::geteuid() } == 0;
    assert!(denied || is_root);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod back");
}
