//! Windows adapter: `NtQueryDirectoryFile` into an owned buffer.
//!
//! Works below `FindFirstFile`/`FindNextFile`: one call returns a chain of
//! `FILE_ID_FULL_DIR_INFORMATION` records (or the narrower
//! `FILE_NAMES_INFORMATION` in names-only mode) carrying most of what a
//! `stat` would, for free.

use super::{buffer_bytes, RecordBuffer};
use crate::entry::DirEntry;
use crate::error::Error;
use crate::ffi;
use crate::parser;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::mem::size_of;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use std::path::Path;
use std::ptr;
use windows_sys::Win32::Foundation::{ERROR_DIRECTORY, HANDLE};
use windows_sys::Win32::Storage::FileSystem::{
    FILE_FLAG_BACKUP_SEMANTICS, FILE_LIST_DIRECTORY, FILE_SHARE_DELETE, FILE_SHARE_READ,
    FILE_SHARE_WRITE,
};

/// The NT query filters names itself.
pub(crate) const NATIVE_GLOB: bool = true;

/// An open directory handle and its batch buffer.
pub(crate) struct RawDir {
    handle: File,
    buffer: RecordBuffer,
    pending: VecDeque<DirEntry>,
    exhausted: bool,
}

impl RawDir {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let handle = OpenOptions::new()
            .access_mode(FILE_LIST_DIRECTORY)
            .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE)
            .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
            .open(path)?;
        // Backup semantics also opens plain files, and FILE_LIST_DIRECTORY
        // is the same bit as FILE_READ_DATA.
        if !handle.metadata()?.is_dir() {
            return Err(io::Error::from_raw_os_error(ERROR_DIRECTORY as i32));
        }

        Ok(Self {
            handle,
            buffer: RecordBuffer::new(),
            pending: VecDeque::new(),
            exhausted: false,
        })
    }

    /// Return up to `max_items` entries, or `None` once the kernel has no more.
    ///
    /// The kernel latches `native_glob` on the first call for a handle;
    /// later patterns are ignored.
    pub(crate) fn read_batch(
        &mut self,
        max_items: usize,
        native_glob: Option<&OsStr>,
        names_only: bool,
    ) -> Result<Option<Vec<DirEntry>>, Error> {
        if self.pending.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            let query = Query {
                max_items,
                glob: native_glob,
                names_only,
                single: false,
            };
            match self.query(&query)? {
                Some(entries) => {
                    tracing::trace!(entries = entries.len(), "NtQueryDirectoryFile batch");
                    self.pending.extend(entries);
                }
                None => {
                    self.exhausted = true;
                    return Ok(None);
                }
            }
        }

        let take = max_items.min(self.pending.len());
        Ok(Some(self.pending.drain(..take).collect()))
    }

    /// One `NtQueryDirectoryFile` call, parsed.
    fn query(&mut self, query: &Query<'_>) -> Result<Option<Vec<DirEntry>>, Error> {
        let (class, record_size) = if query.names_only {
            (
                ffi::FILE_NAMES_INFORMATION_CLASS,
                size_of::<ffi::FILE_NAMES_INFORMATION>(),
            )
        } else {
            (
                ffi::FILE_ID_FULL_DIRECTORY_INFORMATION_CLASS,
                size_of::<ffi::FILE_ID_FULL_DIR_INFORMATION>(),
            )
        };
        let length = buffer_bytes(query.max_items, record_size);
        self.buffer.reserve(length)?;

        let mut wide: Vec<u16> = query
            .glob
            .filter(|g| !g.is_empty())
            .map(|g| g.encode_wide().collect())
            .unwrap_or_default();
        let name_bytes = u16::try_from(wide.len() * 2)
            .map_err(|_| Error::Pattern("name filter longer than 32767 UTF-16 units".into()))?;
        let mut name = ffi::UNICODE_STRING {
            Length: name_bytes,
            MaximumLength: name_bytes,
            Buffer: wide.as_mut_ptr(),
        };
        let name_ptr = if wide.is_empty() {
            ptr::null_mut()
        } else {
            &mut name as *mut ffi::UNICODE_STRING
        };

        let mut isb = ffi::IO_STATUS_BLOCK {
            Status: 0,
            Information: 0,
        };
        let status = unsafe {
            ffi::NtQueryDirectoryFile(
                self.handle.as_raw_handle() as HANDLE,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut isb,
                self.buffer.as_mut_ptr().cast(),
                length as u32,
                class,
                u8::from(query.single),
                name_ptr,
                0,
            )
        };

        match status {
            ffi::STATUS_SUCCESS => {}
            ffi::STATUS_NO_MORE_FILES | ffi::STATUS_NO_SUCH_FILE => return Ok(None),
            other => {
                let code = unsafe { ffi::RtlNtStatusToDosError(other) };
                tracing::trace!(status = %format_args!("{:#010x}", other), "NtQueryDirectoryFile failed");
                return Err(Error::Syscall(io::Error::from_raw_os_error(code as i32)));
            }
        }

        let filled = self.buffer.filled(isb.Information.min(length));
        let entries = if query.names_only {
            parser::parse_names_info(filled)?
        } else {
            parser::parse_full_dir_info(filled)?
        };
        Ok(Some(entries))
    }
}

struct Query<'a> {
    max_items: usize,
    glob: Option<&'a OsStr>,
    names_only: bool,
    single: bool,
}

/// Fetch the full record of `leaf` in `dir` with a single-entry query.
pub(crate) fn query_single(dir: &Path, leaf: &OsStr) -> Result<Option<DirEntry>, Error> {
    let mut raw = RawDir::open(dir).map_err(Error::Open)?;
    let query = Query {
        max_items: 1,
        glob: Some(leaf),
        names_only: false,
        single: true,
    };
    Ok(raw
        .query(&query)?
        .and_then(|entries| entries.into_iter().find(|e| e.name() == leaf)))
}
