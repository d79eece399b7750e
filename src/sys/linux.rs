//! Linux adapter: raw `getdents` into an owned buffer.
//!
//! Bypasses `readdir(3)` so a single syscall fills a caller-sized buffer.
//! On x86 and x86_64 the legacy `getdents` syscall is used; its records
//! carry the file type in the last byte of each record. Other
//! architectures only have `getdents64`.

use super::{buffer_bytes, RecordBuffer};
use crate::entry::DirEntry;
use crate::error::{Error, ParseError};
use crate::ffi;
use crate::parser;
use std::collections::VecDeque;
use std::ffi::{CString, OsStr};
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// The kernel has no name filter for `getdents`.
pub(crate) const NATIVE_GLOB: bool = false;

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "x86")))]
mod layout {
    use super::*;

    pub(super) const RECORD_SIZE: usize = size_of::<ffi::linux_dirent>();

    pub(super) unsafe fn read(fd: libc::c_int, buf: *mut u8, count: libc::c_uint) -> libc::c_long {
        ffi::getdents(fd, buf, count)
    }

    pub(super) fn parse(buffer: &[u8]) -> Result<Vec<DirEntry>, ParseError> {
        parser::parse_linux_dirents(buffer)
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "x86"))))]
mod layout {
    use super::*;

    pub(super) const RECORD_SIZE: usize = size_of::<ffi::linux_dirent64>();

    pub(super) unsafe fn read(fd: libc::c_int, buf: *mut u8, count: libc::c_uint) -> libc::c_long {
        ffi::getdents64(fd, buf, count)
    }

    pub(super) fn parse(buffer: &[u8]) -> Result<Vec<DirEntry>, ParseError> {
        parser::parse_linux_dirents64(buffer)
    }
}

/// An open directory file descriptor and its batch buffer.
pub(crate) struct RawDir {
    fd: OwnedFd,
    buffer: RecordBuffer,
    pending: VecDeque<DirEntry>,
    exhausted: bool,
}

impl RawDir {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte")
        })?;

        let fd = unsafe {
            libc::open(
                c_path.as_ptr(),
                libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            // SAFETY: `fd` was just opened and is owned by nobody else.
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
            buffer: RecordBuffer::new(),
            pending: VecDeque::new(),
            exhausted: false,
        })
    }

    /// Return up to `max_items` entries, or `None` once the kernel has no more.
    ///
    /// Records left over from a previous call are served first, without a
    /// syscall.
    pub(crate) fn read_batch(
        &mut self,
        max_items: usize,
        _native_glob: Option<&OsStr>,
        _names_only: bool,
    ) -> Result<Option<Vec<DirEntry>>, Error> {
        if self.pending.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            let bytes = self.refill(max_items)?;
            if bytes == 0 {
                self.exhausted = true;
                return Ok(None);
            }
            let entries = layout::parse(self.buffer.filled(bytes))?;
            tracing::trace!(bytes, entries = entries.len(), "getdents batch");
            self.pending.extend(entries);
        }

        let take = max_items.min(self.pending.len());
        Ok(Some(self.pending.drain(..take).collect()))
    }

    /// One `getdents` call; returns the number of bytes the kernel wrote.
    fn refill(&mut self, max_items: usize) -> Result<usize, Error> {
        let count = buffer_bytes(max_items, layout::RECORD_SIZE);
        self.buffer.reserve(count)?;

        loop {
            let result = unsafe {
                layout::read(
                    self.fd.as_raw_fd(),
                    self.buffer.as_mut_ptr(),
                    count as libc::c_uint,
                )
            };

            if result < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return Err(Error::Syscall(err));
            }
            return Ok(result as usize);
        }
    }
}
