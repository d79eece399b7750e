//! # fastdir
//!
//! Batched directory enumeration at the syscall level, with metadata
//! fetched lazily, field by field.
//!
//! Each batch is a single kernel call into a caller-sized buffer:
//! `getdents` on Linux, `NtQueryDirectoryFile` on Windows, and buffered
//! `readdir` on other Unix systems. Whatever the kernel hands back for free
//! (inode and type on POSIX, most of `stat` on Windows) is recorded on each
//! [`DirEntry`]; everything else is looked up only when asked for.
//!
//! ## Example
//!
//! ```no_run
//! use fastdir::{read_dir, FieldSet};
//!
//! for entry in read_dir("/usr/lib").unwrap() {
//!     let mut entry = entry.unwrap();
//!     if entry.is_dir() {
//!         continue;
//!     }
//!     let size = entry.size();
//!     println!("{:?}: {} bytes", entry.name(), size);
//! }
//! ```
//!
//! ## Platform Support
//!
//! Linux and Android use raw `getdents`/`getdents64`. Windows uses the NT
//! directory query. Other Unix systems (macOS, the BSDs, Solaris) use
//! `readdir`. Which metadata fields can be supplied at all depends on the
//! platform; see [`supported_fields`].

mod builder;
mod capability;
mod entry;
mod error;
mod fetch;
mod ffi;
mod iter;
mod parser;
mod session;
mod sys;
mod types;

pub use builder::DirReader;
pub use capability::{metadata_supported, supported_fields, Platform};
pub use entry::DirEntry;
pub use error::Error;
pub use iter::{Batches, DirEntries, DEFAULT_BATCH_SIZE};
pub use session::DirHandle;
pub use sys::{MAX_BUFFER_BYTES, MIN_BUFFER_BYTES};
pub use types::{FieldSet, FileType, Stat, Timespec};

use std::ffi::OsStr;
use std::path::Path;

/// Read directory entries in batches of [`DEFAULT_BATCH_SIZE`].
///
/// # Example
///
/// ```no_run
/// for entry in fastdir::read_dir("/tmp")? {
///     println!("{:?}", entry?.name());
/// }
/// # Ok::<(), fastdir::Error>(())
/// ```
pub fn read_dir<P: AsRef<Path>>(path: P) -> Result<DirEntries, Error> {
    DirReader::new(path).read()
}

/// Open `path` for enumeration, or `None` if it cannot be opened.
///
/// The `Option`-returning trio [`begin_enumerate`], [`enumerate`] and
/// [`end_enumerate`] folds errors away; use [`DirHandle`] directly to see
/// them.
pub fn begin_enumerate<P: AsRef<Path>>(path: P) -> Option<DirHandle> {
    let path = path.as_ref();
    match DirHandle::open(path) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "begin_enumerate failed");
            None
        }
    }
}

/// Read the next batch, or `None` at the end of the directory or on error.
///
/// An empty batch is not the end; keep calling until `None`.
pub fn enumerate(
    handle: &mut DirHandle,
    max_items: usize,
    glob: Option<&OsStr>,
    names_only: bool,
) -> Option<Vec<DirEntry>> {
    match handle.next_batch(max_items, glob, names_only) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::debug!(path = %handle.path().display(), error = %e, "enumerate failed");
            None
        }
    }
}

/// Release a handle from [`begin_enumerate`].
pub fn end_enumerate(handle: DirHandle) {
    handle.close();
}
