//! Enumeration sessions: an open directory handle driven batch by batch.

use crate::entry::DirEntry;
use crate::error::Error;
use crate::iter::{BatchOptions, Batches, DirEntries};
use crate::sys::{self, RawDir};
use glob::{MatchOptions, Pattern};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// An open directory being enumerated.
///
/// Owns the platform handle exclusively; it is released exactly once, by
/// [`close`](DirHandle::close) or on drop. `next_batch` takes `&mut self`,
/// so at most one read is in flight per handle.
///
/// # Example
///
/// ```no_run
/// use fastdir::DirHandle;
///
/// let mut handle = DirHandle::open("/var/spool")?;
/// let mut listing = Vec::new();
/// while let Some(batch) = handle.next_batch(10_000, None, false)? {
///     listing.extend(batch);
/// }
/// handle.close();
/// # Ok::<(), fastdir::Error>(())
/// ```
pub struct DirHandle {
    raw: RawDir,
    path: Arc<Path>,
    filter: Option<(OsString, Pattern)>,
}

impl DirHandle {
    /// Open `path` for enumeration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = RawDir::open(path).map_err(Error::Open)?;
        tracing::debug!(path = %path.display(), "opened directory");
        Ok(Self {
            raw,
            path: Arc::from(path),
            filter: None,
        })
    }

    /// The directory this handle enumerates.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next batch of at most `max_items` entries.
    ///
    /// Returns `Ok(None)` only when the directory has no more entries. A
    /// short or empty batch does not mean the end: the name filter or a
    /// partly filled kernel buffer can both produce one.
    ///
    /// `glob` matches leaf names (`*`, `?`, `[...]`). On Windows it is handed
    /// to the kernel, which only honours the pattern given on the first
    /// call; elsewhere it is applied to each batch here. `names_only`
    /// requests the smallest record shape the platform offers.
    pub fn next_batch(
        &mut self,
        max_items: usize,
        glob: Option<&OsStr>,
        names_only: bool,
    ) -> Result<Option<Vec<DirEntry>>, Error> {
        let max_items = max_items.max(1);
        let glob = glob.filter(|g| !g.is_empty());

        let batch = if sys::NATIVE_GLOB {
            self.raw.read_batch(max_items, glob, names_only)?
        } else {
            let batch = self.raw.read_batch(max_items, None, names_only)?;
            match (batch, glob) {
                (Some(entries), Some(glob)) => Some(self.apply_filter(entries, glob)?),
                (batch, _) => batch,
            }
        };

        let Some(mut entries) = batch else {
            tracing::trace!(path = %self.path.display(), "end of directory");
            return Ok(None);
        };
        for entry in &mut entries {
            entry.set_parent(Arc::clone(&self.path));
        }
        Ok(Some(entries))
    }

    fn apply_filter(&mut self, entries: Vec<DirEntry>, glob: &OsStr) -> Result<Vec<DirEntry>, Error> {
        let cached = matches!(&self.filter, Some((source, _)) if source.as_os_str() == glob);
        if !cached {
            let pattern = Pattern::new(&glob.to_string_lossy())?;
            self.filter = Some((glob.to_os_string(), pattern));
        }
        let Some((_, pattern)) = &self.filter else {
            return Ok(entries);
        };
        Ok(entries
            .into_iter()
            .filter(|e| pattern.matches_with(&e.name().to_string_lossy(), MATCH_OPTIONS))
            .collect())
    }

    /// Release the handle.
    pub fn close(self) {
        drop(self);
    }

    /// Iterate over batches of `max_items`, closing the handle at the end.
    pub fn batches(self, max_items: usize) -> Batches {
        Batches::new(
            self,
            BatchOptions {
                max_items,
                ..Default::default()
            },
        )
    }

    /// Iterate over single entries, reading `max_items` at a time.
    pub fn entries(self, max_items: usize) -> DirEntries {
        DirEntries::new(self.batches(max_items))
    }
}

impl Drop for DirHandle {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "closed directory");
    }
}

impl fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirHandle")
            .field("path", &self.path)
            .field("filter", &self.filter.as_ref().map(|(source, _)| source))
            .finish()
    }
}
