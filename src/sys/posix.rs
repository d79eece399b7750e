//! Generic POSIX adapter: buffered `readdir(3)`.
//!
//! The C library already batches the underlying kernel reads, so a batch
//! here is up to `max_items` calls to `readdir`. The type hint is used
//! where `struct dirent` has `d_type`.

use crate::entry::DirEntry;
use crate::error::Error;
use crate::parser;
use std::ffi::{CStr, CString, OsStr};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;

/// `readdir` has no name filter.
pub(crate) const NATIVE_GLOB: bool = false;

/// An open directory stream.
pub(crate) struct RawDir {
    dir: NonNull<libc::DIR>,
    exhausted: bool,
}

// RawDir owns the stream exclusively, safe to send between threads
unsafe impl Send for RawDir {}

impl RawDir {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte")
        })?;

        let dir = unsafe { libc::opendir(c_path.as_ptr()) };
        let dir = NonNull::new(dir).ok_or_else(io::Error::last_os_error)?;
        Ok(Self {
            dir,
            exhausted: false,
        })
    }

    pub(crate) fn read_batch(
        &mut self,
        max_items: usize,
        _native_glob: Option<&OsStr>,
        _names_only: bool,
    ) -> Result<Option<Vec<DirEntry>>, Error> {
        if self.exhausted {
            return Ok(None);
        }

        let mut entries = Vec::with_capacity(max_items.min(4096));
        let mut read = 0;
        while read < max_items {
            // readdir signals errors only through errno.
            unsafe { *errno_location() = 0 };
            let ent = unsafe { libc::readdir(self.dir.as_ptr()) };
            if ent.is_null() {
                let errno = unsafe { *errno_location() };
                if errno != 0 {
                    return Err(Error::Syscall(io::Error::from_raw_os_error(errno)));
                }
                self.exhausted = true;
                break;
            }
            read += 1;

            // SAFETY: non-null results point at a valid dirent until the next readdir.
            let ent = unsafe { &*ent };
            let ino = dirent_ino(ent);
            if ino == 0 {
                continue;
            }
            let name = unsafe { CStr::from_ptr(ent.d_name.as_ptr()) }.to_bytes();
            if parser::is_dot_or_dotdot(name) {
                continue;
            }
            entries.push(parser::posix_entry(name, ino, dirent_type(ent)));
        }

        if read == 0 && self.exhausted {
            return Ok(None);
        }
        tracing::trace!(read, entries = entries.len(), "readdir batch");
        Ok(Some(entries))
    }
}

impl Drop for RawDir {
    fn drop(&mut self) {
        unsafe {
            libc::closedir(self.dir.as_ptr());
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "solaris", target_os = "illumos", target_os = "haiku"))]
fn dirent_ino(ent: &libc::dirent) -> u64 {
    ent.d_ino as u64
}

#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "solaris", target_os = "illumos", target_os = "haiku")))]
fn dirent_ino(ent: &libc::dirent) -> u64 {
    ent.d_fileno as u64
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn dirent_type(ent: &libc::dirent) -> u8 {
    ent.d_type
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn dirent_type(_ent: &libc::dirent) -> u8 {
    crate::ffi::DT_UNKNOWN
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__error()
}

#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno()
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::___errno()
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "solaris",
    target_os = "illumos"
)))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno_location()
}
