//! Platform adapters.
//!
//! Exactly one adapter is compiled per target. Each exposes the same
//! `RawDir` surface:
//!
//! - `RawDir::open(&Path) -> io::Result<RawDir>`
//! - `RawDir::read_batch(&mut self, max_items, native_glob, names_only)`,
//!   at most one kernel call per batch
//! - `Drop` closes the handle
//!
//! `NATIVE_GLOB` says whether the kernel applies the name filter itself.

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use self::linux::{RawDir, NATIVE_GLOB};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use self::windows::{query_single, RawDir, NATIVE_GLOB};

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
mod posix;
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub(crate) use self::posix::{RawDir, NATIVE_GLOB};

#[cfg(not(any(unix, windows)))]
compile_error!("fastdir supports Unix-like systems and Windows only");

/// Smallest buffer handed to the kernel; fits at least one maximal record.
pub const MIN_BUFFER_BYTES: usize = 4 * 1024;

/// Largest buffer handed to the kernel in one call.
pub const MAX_BUFFER_BYTES: usize = 16 * 1024 * 1024;

/// Bytes needed for `max_items` records of `record_size`, clamped.
#[cfg_attr(not(any(target_os = "linux", target_os = "android", windows)), allow(dead_code))]
pub(crate) fn buffer_bytes(max_items: usize, record_size: usize) -> usize {
    max_items
        .saturating_mul(record_size)
        .clamp(MIN_BUFFER_BYTES, MAX_BUFFER_BYTES)
}

/// Owned, 8-byte aligned buffer the kernel writes records into.
///
/// Reused across batches; grows when a larger batch is requested.
#[cfg(any(target_os = "linux", target_os = "android", windows))]
pub(crate) struct RecordBuffer {
    words: Vec<u64>,
}

#[cfg(any(target_os = "linux", target_os = "android", windows))]
impl RecordBuffer {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Make room for at least `bytes` bytes.
    pub fn reserve(&mut self, bytes: usize) -> Result<(), crate::Error> {
        let words = bytes.div_ceil(8);
        if words > self.words.len() {
            let additional = words - self.words.len();
            self.words
                .try_reserve_exact(additional)
                .map_err(|_| crate::Error::Alloc(bytes))?;
            self.words.resize(words, 0);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.words.len() * 8
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr().cast()
    }

    /// The first `len` bytes, as filled in by the kernel.
    pub fn filled(&self, len: usize) -> &[u8] {
        let len = len.min(self.len());
        // SAFETY: the Vec owns `words.len() * 8` initialised bytes and
        // u8 has no alignment requirement.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast(), len) }
    }
}
