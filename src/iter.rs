//! Iterators over a directory: whole batches, or single entries.
//!
//! Both implement the merging contract: read batches until the handle
//! reports the end, in call order. The handle is closed as soon as the
//! end (or an error) is reached.

use crate::entry::DirEntry;
use crate::error::Error;
use crate::session::DirHandle;
use crate::types::FieldSet;
use std::ffi::OsString;

/// Default number of entries requested per batch.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Per-batch request parameters.
#[derive(Debug, Clone)]
pub(crate) struct BatchOptions {
    pub max_items: usize,
    pub glob: Option<OsString>,
    pub names_only: bool,
    /// Fields fetched for every entry as its batch arrives.
    pub prefetch: FieldSet,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_BATCH_SIZE,
            glob: None,
            names_only: false,
            prefetch: FieldSet::empty(),
        }
    }
}

/// Iterator over batches of directory entries.
///
/// Yields `Result<Vec<DirEntry>, Error>`. A batch may be empty without
/// meaning the end. After the last batch, or after an error, the handle is
/// closed and the iterator yields `None`.
///
/// # Thread Safety
///
/// `Batches` is `Send` but not `Sync`: it can move to a worker thread but
/// must not be shared, because it owns the directory handle.
///
/// # Example
///
/// ```no_run
/// use fastdir::DirReader;
///
/// let mut total = 0;
/// for batch in DirReader::new("/tmp").batch_size(50_000).open()? {
///     total += batch?.len();
/// }
/// println!("{total} entries");
/// # Ok::<(), fastdir::Error>(())
/// ```
#[derive(Debug)]
pub struct Batches {
    handle: Option<DirHandle>,
    options: BatchOptions,
}

impl Batches {
    pub(crate) fn new(handle: DirHandle, options: BatchOptions) -> Self {
        Self {
            handle: Some(handle),
            options,
        }
    }
}

impl Iterator for Batches {
    type Item = Result<Vec<DirEntry>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.handle.as_mut()?;
        let result = handle.next_batch(
            self.options.max_items,
            self.options.glob.as_deref(),
            self.options.names_only,
        );

        match result {
            Ok(Some(mut entries)) => {
                if !self.options.prefetch.is_empty() {
                    let prefix = handle.path();
                    for entry in &mut entries {
                        entry.fetch_metadata(prefix, self.options.prefetch);
                    }
                }
                Some(Ok(entries))
            }
            Ok(None) => {
                if let Some(handle) = self.handle.take() {
                    handle.close();
                }
                None
            }
            Err(e) => {
                if let Some(handle) = self.handle.take() {
                    handle.close();
                }
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Batches {}

/// Iterator over single directory entries.
///
/// Yields `Result<DirEntry, Error>` for each entry, refilling from the
/// next batch as needed.
///
/// # Example
///
/// ```no_run
/// use fastdir::read_dir;
///
/// for entry in read_dir("/tmp")? {
///     let entry = entry?;
///     println!("{:?}", entry.name());
/// }
/// # Ok::<(), fastdir::Error>(())
/// ```
#[derive(Debug)]
pub struct DirEntries {
    batches: Batches,
    current: std::vec::IntoIter<DirEntry>,
}

impl DirEntries {
    pub(crate) fn new(batches: Batches) -> Self {
        Self {
            batches,
            current: Vec::new().into_iter(),
        }
    }
}

impl Iterator for DirEntries {
    type Item = Result<DirEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(Ok(entry));
            }

            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl std::iter::FusedIterator for DirEntries {}
