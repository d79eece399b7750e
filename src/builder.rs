//! Builder pattern API for directory reading.
//!
//! Provides a fluent interface for configuring directory reads.

use crate::entry::DirEntry;
use crate::error::Error;
use crate::iter::{BatchOptions, Batches, DirEntries};
use crate::session::DirHandle;
use crate::types::FieldSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Builder for configuring directory reads.
///
/// # Example
///
/// ```no_run
/// use fastdir::{DirReader, FieldSet};
///
/// let entries = DirReader::new("/tmp")
///     .glob("*.log")
///     .prefetch(FieldSet::SIZE | FieldSet::MTIM)
///     .batch_size(16 * 1024)
///     .read()?;
///
/// for entry in entries {
///     let mut entry = entry?;
///     let size = entry.size();
///     println!("{:?}: {} bytes", entry.name(), size);
/// }
/// # Ok::<(), fastdir::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DirReader {
    path: PathBuf,
    options: BatchOptions,
}

impl DirReader {
    /// Create a new directory reader for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            options: BatchOptions::default(),
        }
    }

    /// Set the number of entries requested per batch.
    ///
    /// Larger batches mean fewer kernel calls and a bigger buffer; the
    /// buffer is capped at [`MAX_BUFFER_BYTES`](crate::MAX_BUFFER_BYTES).
    /// Default is 4096. Zero is treated as one.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.options.max_items = size;
        self
    }

    /// Only return entries whose name matches `pattern`.
    pub fn glob<S: AsRef<OsStr>>(mut self, pattern: S) -> Self {
        self.options.glob = Some(pattern.as_ref().to_owned());
        self
    }

    /// Ask for names only, skipping the metadata the platform would
    /// otherwise return with each record.
    pub fn names_only(mut self, names_only: bool) -> Self {
        self.options.names_only = names_only;
        self
    }

    /// Fetch these fields for every entry as its batch arrives.
    ///
    /// Fields already delivered by the batch read cost nothing; the rest
    /// cost one lookup per entry.
    pub fn prefetch(mut self, fields: FieldSet) -> Self {
        self.options.prefetch = fields;
        self
    }

    /// Prefetch every field the platform supports.
    pub fn all_metadata(mut self) -> Self {
        self.options.prefetch = crate::metadata_supported();
        self
    }

    /// Open the directory and return an iterator over batches.
    pub fn open(self) -> Result<Batches, Error> {
        let handle = DirHandle::open(&self.path)?;
        Ok(Batches::new(handle, self.options))
    }

    /// Open the directory and return an iterator over entries.
    pub fn read(self) -> Result<DirEntries, Error> {
        self.open().map(DirEntries::new)
    }

    /// Read the whole directory into a `Vec`.
    pub fn read_all(self) -> Result<Vec<DirEntry>, Error> {
        let mut all = Vec::new();
        for batch in self.open()? {
            all.extend(batch?);
        }
        Ok(all)
    }

    /// The glob pattern, if one was set.
    pub fn pattern(&self) -> Option<&OsStr> {
        self.options.glob.as_deref()
    }
}
