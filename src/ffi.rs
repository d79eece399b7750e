//! Raw kernel record layouts and syscall entry points.
//!
//! References: `linux/dirent.h`, `getdents(2)`, `dirent.h`, `sys/stat.h`,
//! `ntifs.h` (`FILE_ID_FULL_DIR_INFORMATION`, `FILE_NAMES_INFORMATION`).
//!
//! The overlay structs are never dereferenced: the parser reads fields at
//! the offsets they define out of a byte slice. They exist to size the
//! batch buffer and to pin the offsets down in tests.
//!
//! # Safety
//!
//! All functions in this module are unsafe. The safe wrappers live in
//! `crate::sys`.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]

use std::mem::size_of;
use std::os::raw::c_ulong;

// Directory entry type hints (d_type).
pub const DT_UNKNOWN: u8 = 0;
pub const DT_FIFO: u8 = 1;
pub const DT_CHR: u8 = 2;
pub const DT_DIR: u8 = 4;
pub const DT_BLK: u8 = 6;
pub const DT_REG: u8 = 8;
pub const DT_LNK: u8 = 10;
pub const DT_SOCK: u8 = 12;
pub const DT_WHT: u8 = 14;

// File type bits of st_mode.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFIFO: u32 = 0o010000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFSOCK: u32 = 0o140000;

/// Fixed head of the kernel's legacy `struct linux_dirent`.
///
/// The name follows `d_reclen` and is NUL terminated. The file type is not
/// a field: the kernel stores it in the last byte of the record, at
/// `d_reclen - 1`.
#[repr(C)]
pub struct linux_dirent {
    pub d_ino: c_ulong,
    pub d_off: c_ulong,
    pub d_reclen: u16,
}

/// Offset of `d_reclen` in [`linux_dirent`].
pub const LINUX_DIRENT_RECLEN_OFFSET: usize = 2 * size_of::<c_ulong>();

/// Offset of `d_name` in [`linux_dirent`].
pub const LINUX_DIRENT_NAME_OFFSET: usize = LINUX_DIRENT_RECLEN_OFFSET + 2;

/// Fixed head of `struct linux_dirent64`.
#[repr(C)]
pub struct linux_dirent64 {
    pub d_ino: u64,
    pub d_off: i64,
    pub d_reclen: u16,
    pub d_type: u8,
}

pub const LINUX_DIRENT64_RECLEN_OFFSET: usize = 16;
pub const LINUX_DIRENT64_TYPE_OFFSET: usize = 18;
pub const LINUX_DIRENT64_NAME_OFFSET: usize = 19;

/// `FILE_ID_FULL_DIR_INFORMATION`, returned for `FileIdFullDirectoryInformation`.
///
/// Timestamps are 100 ns ticks since 1601-01-01. `EaSize` carries the
/// reparse tag when `FILE_ATTRIBUTE_REPARSE_POINT` is set.
#[repr(C)]
pub struct FILE_ID_FULL_DIR_INFORMATION {
    pub NextEntryOffset: u32,
    pub FileIndex: u32,
    pub CreationTime: i64,
    pub LastAccessTime: i64,
    pub LastWriteTime: i64,
    pub ChangeTime: i64,
    pub EndOfFile: i64,
    pub AllocationSize: i64,
    pub FileAttributes: u32,
    pub FileNameLength: u32,
    pub EaSize: u32,
    pub FileId: i64,
    pub FileName: [u16; 1],
}

pub mod full_dir_info {
    pub const NEXT_ENTRY_OFFSET: usize = 0;
    pub const CREATION_TIME: usize = 8;
    pub const LAST_ACCESS_TIME: usize = 16;
    pub const LAST_WRITE_TIME: usize = 24;
    pub const CHANGE_TIME: usize = 32;
    pub const END_OF_FILE: usize = 40;
    pub const ALLOCATION_SIZE: usize = 48;
    pub const FILE_ATTRIBUTES: usize = 56;
    pub const FILE_NAME_LENGTH: usize = 60;
    pub const EA_SIZE: usize = 64;
    pub const FILE_ID: usize = 72;
    pub const FILE_NAME: usize = 80;
}

/// `FILE_NAMES_INFORMATION`, returned for `FileNamesInformation`.
#[repr(C)]
pub struct FILE_NAMES_INFORMATION {
    pub NextEntryOffset: u32,
    pub FileIndex: u32,
    pub FileNameLength: u32,
    pub FileName: [u16; 1],
}

pub mod names_info {
    pub const NEXT_ENTRY_OFFSET: usize = 0;
    pub const FILE_NAME_LENGTH: usize = 8;
    pub const FILE_NAME: usize = 12;
}

// FILE_INFORMATION_CLASS values.
pub const FILE_NAMES_INFORMATION_CLASS: u32 = 12;
pub const FILE_ID_FULL_DIRECTORY_INFORMATION_CLASS: u32 = 38;

pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x0000_0010;
pub const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;
pub const IO_REPARSE_TAG_SYMLINK: u32 = 0xA000_000C;

pub const STATUS_SUCCESS: i32 = 0;
pub const STATUS_BUFFER_OVERFLOW: i32 = 0x8000_0005_u32 as i32;
pub const STATUS_NO_MORE_FILES: i32 = 0x8000_0006_u32 as i32;
pub const STATUS_NO_SUCH_FILE: i32 = 0xC000_000F_u32 as i32;

/// 100 ns ticks between 1601-01-01 and 1970-01-01.
pub const FILETIME_UNIX_EPOCH_OFFSET: i64 = (27111902_i64 << 32) + 3577643008;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use self::linux_sys::*;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux_sys {
    /// Legacy `getdents(2)`; records are [`super::linux_dirent`].
    ///
    /// # Safety
    ///
    /// - `fd` must be an open directory file descriptor
    /// - `buf` must point to at least `count` writable bytes
    #[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "x86")))]
    pub unsafe fn getdents(fd: libc::c_int, buf: *mut u8, count: libc::c_uint) -> libc::c_long {
        libc::syscall(libc::SYS_getdents, fd, buf, count) as libc::c_long
    }

    /// `getdents64(2)`; records are [`super::linux_dirent64`].
    ///
    /// # Safety
    ///
    /// Same contract as `getdents`.
    pub unsafe fn getdents64(fd: libc::c_int, buf: *mut u8, count: libc::c_uint) -> libc::c_long {
        libc::syscall(libc::SYS_getdents64, fd, buf, count) as libc::c_long
    }
}

#[cfg(windows)]
pub use self::nt::*;

#[cfg(windows)]
mod nt {
    use std::ffi::c_void;
    use windows_sys::Win32::Foundation::HANDLE;

    /// `IO_STATUS_BLOCK`; the status/pointer union is read as a pointer-sized integer.
    #[repr(C)]
    pub struct IO_STATUS_BLOCK {
        pub Status: isize,
        pub Information: usize,
    }

    #[repr(C)]
    pub struct UNICODE_STRING {
        pub Length: u16,
        pub MaximumLength: u16,
        pub Buffer: *mut u16,
    }

    #[link(name = "ntdll")]
    extern "system" {
        /// Native directory query below `FindFirstFile`/`FindNextFile`.
        ///
        /// # Safety
        ///
        /// - `FileHandle` must be a directory handle opened with `FILE_LIST_DIRECTORY`
        /// - `FileInformation` must point to `Length` writable bytes, 8-byte aligned
        /// - `FileName`, if not null, must point to a valid `UNICODE_STRING`
        pub fn NtQueryDirectoryFile(
            FileHandle: HANDLE,
            Event: HANDLE,
            ApcRoutine: *mut c_void,
            ApcContext: *mut c_void,
            IoStatusBlock: *mut IO_STATUS_BLOCK,
            FileInformation: *mut c_void,
            Length: u32,
            FileInformationClass: u32,
            ReturnSingleEntry: u8,
            FileName: *mut UNICODE_STRING,
            RestartScan: u8,
        ) -> i32;

        pub fn RtlNtStatusToDosError(Status: i32) -> u32;
    }
}
