//! Shared value types: the field mask, file types, timestamps and the
//! flat attribute record carried by every entry.

use crate::ffi;
use bitflags::bitflags;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

bitflags! {
    /// A set of `stat`-like attributes.
    ///
    /// Used both as a capability set (what a platform can ever supply) and
    /// as the per-entry "have" mask (what is populated right now).
    ///
    /// # Example
    ///
    /// ```
    /// use fastdir::FieldSet;
    ///
    /// let wanted = FieldSet::SIZE | FieldSet::MTIM;
    /// assert!(wanted.contains(FieldSet::SIZE));
    /// assert!(!wanted.contains(FieldSet::INO));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldSet: u32 {
        /// Device containing the file
        const DEV = 1 << 0;
        /// Inode number / file id
        const INO = 1 << 1;
        /// File type
        const TYPE = 1 << 2;
        /// Type and permission bits
        const MODE = 1 << 3;
        /// Hard link count
        const NLINK = 1 << 4;
        /// Owner user id
        const UID = 1 << 5;
        /// Owner group id
        const GID = 1 << 6;
        /// Device id, for special files
        const RDEV = 1 << 7;
        /// Last access time
        const ATIM = 1 << 8;
        /// Last data modification time
        const MTIM = 1 << 9;
        /// Last status change time
        const CTIM = 1 << 10;
        /// Logical size in bytes
        const SIZE = 1 << 11;
        /// Bytes allocated on disk
        const ALLOCATED = 1 << 12;
        /// 512-byte blocks allocated
        const BLOCKS = 1 << 13;
        /// Preferred I/O block size
        const BLKSIZE = 1 << 14;
        /// User defined file flags
        const FLAGS = 1 << 15;
        /// File generation number
        const GEN = 1 << 16;
        /// Creation (birth) time
        const BIRTHTIM = 1 << 17;
    }
}

/// Type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    /// Block device
    BlockDevice,
    /// Character device
    CharDevice,
    /// Directory
    Directory,
    /// Named pipe (FIFO)
    Fifo,
    /// Symbolic link
    Symlink,
    /// Regular file
    Regular,
    /// Socket
    Socket,
    /// Not known
    #[default]
    Unknown,
}

impl FileType {
    /// Map a `d_type` hint. `DT_UNKNOWN` and unrecognised codes give `None`.
    pub fn from_dtype(d_type: u8) -> Option<Self> {
        match d_type {
            ffi::DT_BLK => Some(FileType::BlockDevice),
            ffi::DT_CHR => Some(FileType::CharDevice),
            ffi::DT_DIR => Some(FileType::Directory),
            ffi::DT_FIFO => Some(FileType::Fifo),
            ffi::DT_LNK => Some(FileType::Symlink),
            ffi::DT_REG => Some(FileType::Regular),
            ffi::DT_SOCK => Some(FileType::Socket),
            _ => None,
        }
    }

    /// Map the `S_IFMT` bits of an `st_mode`.
    pub fn from_mode(mode: u32) -> Self {
        match mode & ffi::S_IFMT {
            ffi::S_IFBLK => FileType::BlockDevice,
            ffi::S_IFCHR => FileType::CharDevice,
            ffi::S_IFDIR => FileType::Directory,
            ffi::S_IFIFO => FileType::Fifo,
            ffi::S_IFLNK => FileType::Symlink,
            ffi::S_IFREG => FileType::Regular,
            ffi::S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    /// Derive a type from NT file attributes and, for reparse points, the
    /// reparse tag.
    pub(crate) fn from_nt_attributes(attributes: u32, reparse_tag: u32) -> Self {
        if attributes & ffi::FILE_ATTRIBUTE_REPARSE_POINT != 0
            && reparse_tag == ffi::IO_REPARSE_TAG_SYMLINK
        {
            FileType::Symlink
        } else if attributes & ffi::FILE_ATTRIBUTE_DIRECTORY != 0 {
            FileType::Directory
        } else {
            FileType::Regular
        }
    }
}

/// A timestamp as seconds and nanoseconds relative to the Unix epoch.
///
/// `nsec` is always below one second, also for times before 1970.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: u32,
}

impl Timespec {
    const NANOS_PER_SEC: i64 = 1_000_000_000;
    const TICKS_PER_SEC: i64 = 10_000_000;

    /// Create a timestamp, normalising `nsec` into `0..1_000_000_000`.
    pub fn new(sec: i64, nsec: i64) -> Self {
        let sec = sec + nsec.div_euclid(Self::NANOS_PER_SEC);
        let nsec = nsec.rem_euclid(Self::NANOS_PER_SEC) as u32;
        Self { sec, nsec }
    }

    /// Convert Windows 100 ns ticks since 1601-01-01.
    ///
    /// Exact over the whole `i64` range.
    pub fn from_filetime(ticks: i64) -> Self {
        let since_unix = i128::from(ticks) - i128::from(ffi::FILETIME_UNIX_EPOCH_OFFSET);
        let per_sec = i128::from(Self::TICKS_PER_SEC);
        Self {
            sec: since_unix.div_euclid(per_sec) as i64,
            nsec: (since_unix.rem_euclid(per_sec) * 100) as u32,
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, i64::from(d.subsec_nanos())),
            Err(e) => {
                let d = e.duration();
                Self::new(-(d.as_secs() as i64), -i64::from(d.subsec_nanos()))
            }
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        if self.sec >= 0 {
            UNIX_EPOCH + Duration::new(self.sec as u64, self.nsec)
        } else {
            UNIX_EPOCH - Duration::from_secs(self.sec.unsigned_abs()) + Duration::from_nanos(u64::from(self.nsec))
        }
    }
}

/// Attribute values of one entry.
///
/// Only fields named in the owning entry's `metadata_ready()` mask carry
/// meaning; the rest hold their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub dev: u64,
    pub ino: u64,
    pub file_type: FileType,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
    pub size: u64,
    pub allocated: u64,
    pub blocks: u64,
    pub blksize: u64,
    pub flags: u32,
    pub generation: u32,
    pub birthtime: Timespec,
}

impl Stat {
    /// Copy the fields named in `fields` from `other`.
    pub(crate) fn merge(&mut self, other: &Stat, fields: FieldSet) {
        if fields.contains(FieldSet::DEV) {
            self.dev = other.dev;
        }
        if fields.contains(FieldSet::INO) {
            self.ino = other.ino;
        }
        if fields.contains(FieldSet::TYPE) {
            self.file_type = other.file_type;
        }
        if fields.contains(FieldSet::MODE) {
            self.mode = other.mode;
        }
        if fields.contains(FieldSet::NLINK) {
            self.nlink = other.nlink;
        }
        if fields.contains(FieldSet::UID) {
            self.uid = other.uid;
        }
        if fields.contains(FieldSet::GID) {
            self.gid = other.gid;
        }
        if fields.contains(FieldSet::RDEV) {
            self.rdev = other.rdev;
        }
        if fields.contains(FieldSet::ATIM) {
            self.atime = other.atime;
        }
        if fields.contains(FieldSet::MTIM) {
            self.mtime = other.mtime;
        }
        if fields.contains(FieldSet::CTIM) {
            self.ctime = other.ctime;
        }
        if fields.contains(FieldSet::SIZE) {
            self.size = other.size;
        }
        if fields.contains(FieldSet::ALLOCATED) {
            self.allocated = other.allocated;
        }
        if fields.contains(FieldSet::BLOCKS) {
            self.blocks = other.blocks;
        }
        if fields.contains(FieldSet::BLKSIZE) {
            self.blksize = other.blksize;
        }
        if fields.contains(FieldSet::FLAGS) {
            self.flags = other.flags;
        }
        if fields.contains(FieldSet::GEN) {
            self.generation = other.generation;
        }
        if fields.contains(FieldSet::BIRTHTIM) {
            self.birthtime = other.birthtime;
        }
    }
}
