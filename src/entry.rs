//! A single directory entry and its lazily populated metadata.

use crate::capability::metadata_supported;
use crate::fetch::{self, Snapshot};
use crate::types::{FieldSet, FileType, Stat, Timespec};
use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One named child of a directory plus whatever metadata is known about it.
///
/// Entries compare, order and hash by name alone.
///
/// The batch read fills in whatever the kernel returned for free (usually
/// inode and type on POSIX systems; inode, type, sizes and timestamps on
/// Windows). Anything else is fetched on demand, either in bulk with
/// [`fetch_metadata`](DirEntry::fetch_metadata) or one field at a time
/// through the accessors.
///
/// # Example
///
/// ```no_run
/// use fastdir::{read_dir, FieldSet};
///
/// for entry in read_dir("/var/log")? {
///     let mut entry = entry?;
///     let have = entry.fetch_metadata("/var/log".as_ref(), FieldSet::SIZE | FieldSet::MTIM);
///     if have.contains(FieldSet::SIZE) {
///         let size = entry.size();
///         println!("{:?}: {} bytes", entry.name(), size);
///     }
/// }
/// # Ok::<(), fastdir::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: OsString,
    have: FieldSet,
    stat: Stat,
    parent: Option<Arc<Path>>,
}

impl DirEntry {
    pub(crate) fn new(name: OsString, have: FieldSet, stat: Stat) -> Self {
        Self {
            name,
            have,
            stat,
            parent: None,
        }
    }

    #[cfg_attr(not(windows), allow(dead_code))]
    pub(crate) fn stat_snapshot(&self) -> Stat {
        self.stat
    }

    pub(crate) fn set_parent(&mut self, parent: Arc<Path>) {
        self.parent = Some(parent);
    }

    /// The leaf name of the entry.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// The directory this entry was enumerated from joined with its name.
    pub fn path(&self) -> Option<PathBuf> {
        self.parent.as_ref().map(|p| p.join(&self.name))
    }

    /// Fields populated right now.
    pub fn metadata_ready(&self) -> FieldSet {
        self.have
    }

    /// Fetch `wanted` fields for `prefix/name`, returning the fields now populated.
    ///
    /// Fields the platform cannot supply are dropped from the request. If
    /// everything left is already populated no syscall is made. If the
    /// lookup fails (the entry vanished, permission denied) nothing is
    /// populated; check the returned mask.
    pub fn fetch_metadata(&mut self, prefix: &Path, wanted: FieldSet) -> FieldSet {
        self.fetch_with(prefix, wanted, fetch::lookup)
    }

    fn fetch_with<F>(&mut self, prefix: &Path, wanted: FieldSet, lookup: F) -> FieldSet
    where
        F: FnOnce(&Path) -> Option<Snapshot>,
    {
        let missing = (wanted & metadata_supported()) - self.have;
        if missing.is_empty() {
            return self.have;
        }

        if let Some(snapshot) = lookup(&prefix.join(&self.name)) {
            let obtained = missing & snapshot.fields;
            self.stat.merge(&snapshot.stat, obtained);
            self.have |= obtained;
        }
        self.have
    }

    fn ensure(&mut self, field: FieldSet) {
        if !self.have.contains(field) {
            let prefix = self.parent.clone();
            let prefix = prefix.as_deref().unwrap_or_else(|| Path::new(""));
            self.fetch_metadata(prefix, field);
        }
    }

    /// The type reported by the batch read or an earlier fetch, without fetching.
    pub fn file_type_hint(&self) -> Option<FileType> {
        self.have
            .contains(FieldSet::TYPE)
            .then_some(self.stat.file_type)
    }

    /// Check if this entry is known to be a directory.
    pub fn is_dir(&self) -> bool {
        self.file_type_hint() == Some(FileType::Directory)
    }

    /// Check if this entry is known to be a regular file.
    pub fn is_file(&self) -> bool {
        self.file_type_hint() == Some(FileType::Regular)
    }

    /// Check if this entry is known to be a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.file_type_hint() == Some(FileType::Symlink)
    }

    // Per-field accessors. Each fetches its field when missing; if that
    // fails the default value is returned, so check `metadata_ready()` when
    // zero and "unavailable" must be told apart.

    /// Device containing the entry.
    pub fn dev(&mut self) -> u64 {
        self.ensure(FieldSet::DEV);
        self.stat.dev
    }

    /// Inode number or file id.
    pub fn ino(&mut self) -> u64 {
        self.ensure(FieldSet::INO);
        self.stat.ino
    }

    /// File type. Symbolic links are not followed.
    pub fn file_type(&mut self) -> FileType {
        self.ensure(FieldSet::TYPE);
        self.stat.file_type
    }

    /// Type and permission bits.
    pub fn mode(&mut self) -> u32 {
        self.ensure(FieldSet::MODE);
        self.stat.mode
    }

    /// Hard link count.
    pub fn nlink(&mut self) -> u64 {
        self.ensure(FieldSet::NLINK);
        self.stat.nlink
    }

    /// Owner user id.
    pub fn uid(&mut self) -> u32 {
        self.ensure(FieldSet::UID);
        self.stat.uid
    }

    /// Owner group id.
    pub fn gid(&mut self) -> u32 {
        self.ensure(FieldSet::GID);
        self.stat.gid
    }

    /// Device id of a special file.
    pub fn rdev(&mut self) -> u64 {
        self.ensure(FieldSet::RDEV);
        self.stat.rdev
    }

    /// Last access time.
    pub fn atime(&mut self) -> Timespec {
        self.ensure(FieldSet::ATIM);
        self.stat.atime
    }

    /// Last data modification time.
    pub fn mtime(&mut self) -> Timespec {
        self.ensure(FieldSet::MTIM);
        self.stat.mtime
    }

    /// Last status change time.
    pub fn ctime(&mut self) -> Timespec {
        self.ensure(FieldSet::CTIM);
        self.stat.ctime
    }

    /// Logical size in bytes.
    pub fn size(&mut self) -> u64 {
        self.ensure(FieldSet::SIZE);
        self.stat.size
    }

    /// Bytes allocated on disk.
    pub fn allocated(&mut self) -> u64 {
        self.ensure(FieldSet::ALLOCATED);
        self.stat.allocated
    }

    /// 512-byte blocks allocated.
    pub fn blocks(&mut self) -> u64 {
        self.ensure(FieldSet::BLOCKS);
        self.stat.blocks
    }

    /// Preferred I/O block size.
    pub fn blksize(&mut self) -> u64 {
        self.ensure(FieldSet::BLKSIZE);
        self.stat.blksize
    }

    /// User defined file flags (`st_flags`).
    pub fn flags(&mut self) -> u32 {
        self.ensure(FieldSet::FLAGS);
        self.stat.flags
    }

    /// File generation number.
    pub fn generation(&mut self) -> u32 {
        self.ensure(FieldSet::GEN);
        self.stat.generation
    }

    /// Creation time.
    pub fn birthtime(&mut self) -> Timespec {
        self.ensure(FieldSet::BIRTHTIM);
        self.stat.birthtime
    }
}

impl PartialEq for DirEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DirEntry {}

impl PartialOrd for DirEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for DirEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;

    fn entry(name: &str, have: FieldSet, stat: Stat) -> DirEntry {
        DirEntry::new(OsString::from(name), have, stat)
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            stat: Stat {
                ino: 7,
                size: 4096,
                file_type: FileType::Regular,
                mtime: Timespec::new(1_700_000_000, 5),
                ..Default::default()
            },
            fields: metadata_supported(),
        }
    }

    #[test]
    fn test_equality_ignores_attributes() {
        let a = entry("same", FieldSet::INO, Stat { ino: 1, ..Default::default() });
        let b = entry("same", FieldSet::empty(), Stat::default());
        let c = entry("other", FieldSet::INO, Stat { ino: 1, ..Default::default() });
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_ordering_by_name() {
        let mut entries = vec![
            entry("b", FieldSet::empty(), Stat::default()),
            entry("a", FieldSet::empty(), Stat::default()),
            entry("c", FieldSet::empty(), Stat::default()),
        ];
        entries.sort();
        let names: Vec<_> = entries.iter().map(|e| e.name().to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_fetch_populates_requested_fields_only() {
        let mut e = entry("f", FieldSet::empty(), Stat::default());
        let have = e.fetch_with(Path::new("/d"), FieldSet::SIZE | FieldSet::INO, |_| Some(snapshot()));
        assert_eq!(have, FieldSet::SIZE | FieldSet::INO);
        assert_eq!(e.stat.size, 4096);
        assert_eq!(e.stat.ino, 7);
        assert_eq!(e.stat.mtime, Timespec::default());
    }

    #[test]
    fn test_fetch_joins_prefix_and_name() {
        let mut e = entry("leaf", FieldSet::empty(), Stat::default());
        e.fetch_with(Path::new("/some/dir"), FieldSet::SIZE, |path| {
            assert_eq!(path, Path::new("/some/dir/leaf"));
            Some(snapshot())
        });
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let calls = Cell::new(0);
        let lookup = |_: &Path| {
            calls.set(calls.get() + 1);
            Some(snapshot())
        };

        let mut e = entry("f", FieldSet::empty(), Stat::default());
        let first = e.fetch_with(Path::new("/d"), FieldSet::SIZE, lookup);
        let stat_after_first = e.stat;
        let second = e.fetch_with(Path::new("/d"), FieldSet::SIZE, lookup);

        assert_eq!(first, second);
        assert_eq!(e.stat, stat_after_first);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fetch_never_exceeds_supported() {
        let mut e = entry("f", FieldSet::empty(), Stat::default());
        let have = e.fetch_with(Path::new("/d"), FieldSet::all(), |_| {
            Some(Snapshot {
                stat: Stat::default(),
                fields: FieldSet::all(),
            })
        });
        assert!(metadata_supported().contains(have));
    }

    #[test]
    fn test_fetch_unsupported_field_skips_lookup() {
        let unsupported = FieldSet::all() - metadata_supported();
        let mut e = entry("f", FieldSet::INO, Stat::default());
        let have = e.fetch_with(Path::new("/d"), unsupported, |_| {
            panic!("lookup must not run for unsupported fields")
        });
        assert_eq!(have, FieldSet::INO);
    }

    #[test]
    fn test_fetch_already_present_skips_lookup() {
        let mut e = entry("f", FieldSet::INO, Stat { ino: 3, ..Default::default() });
        let have = e.fetch_with(Path::new("/d"), FieldSet::INO, |_| {
            panic!("lookup must not run for populated fields")
        });
        assert_eq!(have, FieldSet::INO);
        assert_eq!(e.stat.ino, 3);
    }

    #[test]
    fn test_failed_lookup_sets_nothing() {
        let mut e = entry("gone", FieldSet::INO, Stat::default());
        let have = e.fetch_with(Path::new("/d"), FieldSet::SIZE | FieldSet::MTIM, |_| None);
        assert_eq!(have, FieldSet::INO);
    }

    #[test]
    fn test_fetch_does_not_overwrite_populated_fields() {
        let mut e = entry("f", FieldSet::INO, Stat { ino: 99, ..Default::default() });
        e.fetch_with(Path::new("/d"), FieldSet::INO | FieldSet::SIZE, |_| Some(snapshot()));
        assert_eq!(e.stat.ino, 99);
        assert_eq!(e.stat.size, 4096);
    }

    #[test]
    fn test_type_hint_requires_have_bit() {
        let e = entry("f", FieldSet::empty(), Stat { file_type: FileType::Directory, ..Default::default() });
        assert_eq!(e.file_type_hint(), None);
        assert!(!e.is_dir());

        let e = entry("f", FieldSet::TYPE, Stat { file_type: FileType::Directory, ..Default::default() });
        assert!(e.is_dir());
        assert!(!e.is_file());
        assert!(!e.is_symlink());
    }

    #[test]
    fn test_unknown_type_resolved_by_fetch() {
        let mut e = crate::parser::posix_entry(b"f", 7, crate::ffi::DT_UNKNOWN);
        assert_eq!(e.metadata_ready(), FieldSet::INO);

        let have = e.fetch_with(Path::new("/d"), FieldSet::TYPE, |_| Some(snapshot()));
        assert!(have.contains(FieldSet::TYPE));
        assert_eq!(e.file_type_hint(), Some(FileType::Regular));
    }

    #[test]
    fn test_file_type_accessor_fetches_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        for (name, expected) in [("plain", FileType::Regular), ("sub", FileType::Directory)] {
            let mut e = crate::parser::posix_entry(name.as_bytes(), 1, crate::ffi::DT_UNKNOWN);
            e.set_parent(Arc::from(dir.path()));
            assert_eq!(e.file_type_hint(), None);
            assert_eq!(e.file_type(), expected);
            assert!(e.metadata_ready().contains(FieldSet::TYPE));
        }
    }

    #[test]
    fn test_path_uses_parent() {
        let mut e = entry("leaf", FieldSet::empty(), Stat::default());
        assert_eq!(e.path(), None);
        e.set_parent(Arc::from(Path::new("/base")));
        assert_eq!(e.path(), Some(PathBuf::from("/base/leaf")));
    }
}
