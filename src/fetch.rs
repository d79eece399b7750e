//! Path-based metadata lookup behind `DirEntry::fetch_metadata`.

use crate::types::{FieldSet, Stat};
use std::path::Path;

/// Everything one lookup produced, and which of its fields are meaningful.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Snapshot {
    pub stat: Stat,
    pub fields: FieldSet,
}

/// Look up `path` without following a final symbolic link.
///
/// Failures are not errors at this layer; they come back as `None`.
#[cfg(unix)]
pub(crate) fn lookup(path: &Path) -> Option<Snapshot> {
    use crate::types::{FileType, Timespec};
    use std::os::unix::fs::MetadataExt;

    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::trace!(path = %path.display(), error = %err, "metadata lookup failed");
            return None;
        }
    };

    let stat = Stat {
        dev: meta.dev(),
        ino: meta.ino(),
        file_type: FileType::from_mode(meta.mode()),
        mode: meta.mode(),
        nlink: meta.nlink(),
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev(),
        atime: Timespec::new(meta.atime(), meta.atime_nsec()),
        mtime: Timespec::new(meta.mtime(), meta.mtime_nsec()),
        ctime: Timespec::new(meta.ctime(), meta.ctime_nsec()),
        size: meta.size(),
        // st_blocks counts 512-byte units regardless of st_blksize.
        allocated: meta.blocks().saturating_mul(512),
        blocks: meta.blocks(),
        blksize: meta.blksize(),
        ..Default::default()
    };
    let fields = FieldSet::DEV
        | FieldSet::INO
        | FieldSet::TYPE
        | FieldSet::MODE
        | FieldSet::NLINK
        | FieldSet::UID
        | FieldSet::GID
        | FieldSet::RDEV
        | FieldSet::ATIM
        | FieldSet::MTIM
        | FieldSet::CTIM
        | FieldSet::SIZE
        | FieldSet::ALLOCATED
        | FieldSet::BLOCKS
        | FieldSet::BLKSIZE;

    let snapshot = Snapshot { stat, fields };
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    let snapshot = bsd_extensions(&meta, snapshot);

    Some(snapshot)
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn bsd_extensions(meta: &std::fs::Metadata, mut snapshot: Snapshot) -> Snapshot {
    use crate::types::Timespec;
    #[cfg(target_os = "freebsd")]
    use std::os::freebsd::fs::MetadataExt as _;
    #[cfg(target_os = "ios")]
    use std::os::ios::fs::MetadataExt as _;
    #[cfg(target_os = "macos")]
    use std::os::macos::fs::MetadataExt as _;

    snapshot.stat.flags = meta.st_flags();
    snapshot.stat.generation = meta.st_gen();
    snapshot.fields |= FieldSet::FLAGS | FieldSet::GEN;

    // Filesystems without a birth time report an error here.
    if let Ok(created) = meta.created() {
        snapshot.stat.birthtime = Timespec::from_system_time(created);
        snapshot.fields |= FieldSet::BIRTHTIM;
    }
    snapshot
}

/// Look up `path` by querying its parent directory for that single name.
///
/// This yields the same record, and so the same fields, as the batch read.
#[cfg(windows)]
pub(crate) fn lookup(path: &Path) -> Option<Snapshot> {
    let (parent, leaf) = match (path.parent(), path.file_name()) {
        (Some(parent), Some(leaf)) => (parent, leaf),
        _ => return None,
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    match crate::sys::query_single(parent, leaf) {
        Ok(Some(entry)) => Some(Snapshot {
            stat: entry.stat_snapshot(),
            fields: entry.metadata_ready(),
        }),
        Ok(None) => {
            tracing::trace!(path = %path.display(), "metadata lookup found no entry");
            None
        }
        Err(err) => {
            tracing::trace!(path = %path.display(), error = %err, "metadata lookup failed");
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::FileType;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_lookup_regular_file() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("data.bin");
        fs::write(&path, vec![0u8; 1234]).expect("write file");

        let snapshot = lookup(&path).expect("lookup succeeds");
        assert_eq!(snapshot.stat.size, 1234);
        assert_eq!(snapshot.stat.file_type, FileType::Regular);
        assert!(snapshot.fields.contains(FieldSet::SIZE | FieldSet::TYPE | FieldSet::INO));
    }

    #[test]
    fn test_lookup_does_not_follow_symlinks() {
        let dir = tempdir().expect("create temp dir");
        fs::write(dir.path().join("target"), "x").expect("write target");
        std::os::unix::fs::symlink("target", dir.path().join("link")).expect("symlink");

        let snapshot = lookup(&dir.path().join("link")).expect("lookup succeeds");
        assert_eq!(snapshot.stat.file_type, FileType::Symlink);
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    #[test]
    fn test_lookup_fills_bsd_fields() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("f");
        fs::write(&path, "x").expect("write file");

        let snapshot = lookup(&path).expect("lookup succeeds");
        assert!(snapshot.fields.contains(FieldSet::FLAGS | FieldSet::GEN));
    }

    #[test]
    fn test_lookup_missing_path() {
        let dir = tempdir().expect("create temp dir");
        assert!(lookup(&dir.path().join("missing")).is_none());
    }
}
