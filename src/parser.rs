//! Parsing of raw directory-read buffers into entries.
//!
//! Three record layouts are understood. All of them are chains of
//! variable-length records, walked by a per-record length or next-offset
//! field:
//!
//! Legacy `getdents` (Linux x86/x86_64):
//! ```text
//! +------------------+
//! | d_ino   (word)   |
//! +------------------+
//! | d_off   (word)   |
//! +------------------+
//! | d_reclen (u16)   |  Total length of this record
//! +------------------+
//! | d_name ... NUL   |
//! | padding          |
//! | d_type (u8)      |  Last byte of the record, at d_reclen - 1
//! +------------------+
//! ```
//!
//! `getdents64`: `d_ino (u64) | d_off (i64) | d_reclen (u16) | d_type (u8) | d_name ... NUL`.
//!
//! NT `FILE_ID_FULL_DIR_INFORMATION` / `FILE_NAMES_INFORMATION`: little-endian,
//! `NextEntryOffset` links the records (0 ends the chain), and the UTF-16
//! name length is given in bytes.
//!
//! Every read is bounds-checked against the valid part of the buffer; a
//! corrupt length field ends the parse with a [`ParseError`].

// All layouts are compiled on every target so their tests run everywhere.
#![allow(dead_code)]

use crate::entry::DirEntry;
use crate::error::ParseError;
use crate::ffi::{self, full_dir_info, names_info};
use crate::types::{FieldSet, FileType, Stat, Timespec};
use std::ffi::OsString;
use std::mem::size_of;
use std::os::raw::c_ulong;

/// Bounds-checked reader over the valid bytes of a kernel buffer.
pub(crate) struct BufferParser<'a> {
    buffer: &'a [u8],
}

impl<'a> BufferParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N], ParseError> {
        let end = offset.checked_add(N).ok_or(ParseError::UnexpectedEnd)?;
        self.buffer
            .get(offset..end)
            .and_then(|b| b.try_into().ok())
            .ok_or(ParseError::UnexpectedEnd)
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], ParseError> {
        let end = offset.checked_add(len).ok_or(ParseError::InvalidOffset)?;
        self.buffer.get(offset..end).ok_or(ParseError::InvalidOffset)
    }

    fn read_u8(&self, offset: usize) -> Result<u8, ParseError> {
        self.buffer.get(offset).copied().ok_or(ParseError::UnexpectedEnd)
    }

    fn read_u16(&self, offset: usize) -> Result<u16, ParseError> {
        Ok(u16::from_ne_bytes(self.bytes(offset)?))
    }

    fn read_u32(&self, offset: usize) -> Result<u32, ParseError> {
        Ok(u32::from_ne_bytes(self.bytes(offset)?))
    }

    fn read_u64(&self, offset: usize) -> Result<u64, ParseError> {
        Ok(u64::from_ne_bytes(self.bytes(offset)?))
    }

    /// Read a native `unsigned long` of `width` bytes.
    fn read_word(&self, offset: usize, width: usize) -> Result<u64, ParseError> {
        match width {
            4 => self.read_u32(offset).map(u64::from),
            8 => self.read_u64(offset),
            _ => Err(ParseError::InvalidEntryLength),
        }
    }

    fn read_u32_le(&self, offset: usize) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.bytes(offset)?))
    }

    fn read_i64_le(&self, offset: usize) -> Result<i64, ParseError> {
        Ok(i64::from_le_bytes(self.bytes(offset)?))
    }

    /// Bounds of the record starting at `offset` with length `reclen`.
    fn record(&self, offset: usize, reclen: usize, min_len: usize) -> Result<&'a [u8], ParseError> {
        if reclen < min_len {
            return Err(ParseError::InvalidEntryLength);
        }
        self.slice(offset, reclen)
    }
}

/// Parse a legacy `getdents` buffer using the native word size.
pub(crate) fn parse_linux_dirents(buffer: &[u8]) -> Result<Vec<DirEntry>, ParseError> {
    parse_linux_dirents_with_word(buffer, size_of::<c_ulong>())
}

/// Parse a legacy `getdents` buffer whose `d_ino`/`d_off` are `word` bytes wide.
pub(crate) fn parse_linux_dirents_with_word(
    buffer: &[u8],
    word: usize,
) -> Result<Vec<DirEntry>, ParseError> {
    let parser = BufferParser::new(buffer);
    let reclen_at = 2 * word;
    let name_at = reclen_at + 2;
    // Smallest record: header, empty name, NUL, type byte.
    let min_len = name_at + 2;

    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < buffer.len() {
        let reclen = usize::from(parser.read_u16(offset + reclen_at)?);
        let record = parser.record(offset, reclen, min_len)?;
        let ino = parser.read_word(offset, word)?;
        offset += reclen;

        // Deleted or unused slot.
        if ino == 0 {
            continue;
        }
        let name = until_nul(&record[name_at..reclen - 1]);
        if is_dot_or_dotdot(name) {
            continue;
        }
        entries.push(posix_entry(name, ino, record[reclen - 1]));
    }
    Ok(entries)
}

/// Parse a `getdents64` buffer.
pub(crate) fn parse_linux_dirents64(buffer: &[u8]) -> Result<Vec<DirEntry>, ParseError> {
    let parser = BufferParser::new(buffer);
    let min_len = ffi::LINUX_DIRENT64_NAME_OFFSET + 1;

    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < buffer.len() {
        let reclen = usize::from(parser.read_u16(offset + ffi::LINUX_DIRENT64_RECLEN_OFFSET)?);
        let record = parser.record(offset, reclen, min_len)?;
        let ino = parser.read_u64(offset)?;
        let d_type = parser.read_u8(offset + ffi::LINUX_DIRENT64_TYPE_OFFSET)?;
        offset += reclen;

        if ino == 0 {
            continue;
        }
        let name = until_nul(&record[ffi::LINUX_DIRENT64_NAME_OFFSET..]);
        if is_dot_or_dotdot(name) {
            continue;
        }
        entries.push(posix_entry(name, ino, d_type));
    }
    Ok(entries)
}

/// Entry for a POSIX record: inode always, type when the hint is known.
pub(crate) fn posix_entry(name: &[u8], ino: u64, d_type: u8) -> DirEntry {
    let mut have = FieldSet::INO;
    let mut stat = Stat {
        ino,
        ..Default::default()
    };
    if let Some(file_type) = FileType::from_dtype(d_type) {
        stat.file_type = file_type;
        have |= FieldSet::TYPE;
    }
    DirEntry::new(os_from_bytes(name), have, stat)
}

/// Parse a `FILE_ID_FULL_DIR_INFORMATION` chain.
pub(crate) fn parse_full_dir_info(buffer: &[u8]) -> Result<Vec<DirEntry>, ParseError> {
    let have = FieldSet::INO
        | FieldSet::TYPE
        | FieldSet::ATIM
        | FieldSet::MTIM
        | FieldSet::CTIM
        | FieldSet::SIZE
        | FieldSet::ALLOCATED
        | FieldSet::BIRTHTIM;

    walk_nt_chain(
        buffer,
        full_dir_info::FILE_NAME,
        full_dir_info::NEXT_ENTRY_OFFSET,
        full_dir_info::FILE_NAME_LENGTH,
        |parser, offset, name| {
            let attributes = parser.read_u32_le(offset + full_dir_info::FILE_ATTRIBUTES)?;
            let reparse_tag = parser.read_u32_le(offset + full_dir_info::EA_SIZE)?;
            let time = |field: usize| -> Result<Timespec, ParseError> {
                Ok(Timespec::from_filetime(parser.read_i64_le(offset + field)?))
            };
            let size = |field: usize| -> Result<u64, ParseError> {
                Ok(parser.read_i64_le(offset + field)?.max(0) as u64)
            };

            let stat = Stat {
                ino: parser.read_i64_le(offset + full_dir_info::FILE_ID)? as u64,
                file_type: FileType::from_nt_attributes(attributes, reparse_tag),
                atime: time(full_dir_info::LAST_ACCESS_TIME)?,
                mtime: time(full_dir_info::LAST_WRITE_TIME)?,
                ctime: time(full_dir_info::CHANGE_TIME)?,
                birthtime: time(full_dir_info::CREATION_TIME)?,
                size: size(full_dir_info::END_OF_FILE)?,
                allocated: size(full_dir_info::ALLOCATION_SIZE)?,
                ..Default::default()
            };
            Ok(DirEntry::new(name, have, stat))
        },
    )
}

/// Parse a `FILE_NAMES_INFORMATION` chain.
pub(crate) fn parse_names_info(buffer: &[u8]) -> Result<Vec<DirEntry>, ParseError> {
    walk_nt_chain(
        buffer,
        names_info::FILE_NAME,
        names_info::NEXT_ENTRY_OFFSET,
        names_info::FILE_NAME_LENGTH,
        |_, _, name| Ok(DirEntry::new(name, FieldSet::empty(), Stat::default())),
    )
}

/// Walk an NT `NextEntryOffset` chain, skipping `.` and `..`.
fn walk_nt_chain<F>(
    buffer: &[u8],
    name_at: usize,
    next_at: usize,
    name_len_at: usize,
    mut build: F,
) -> Result<Vec<DirEntry>, ParseError>
where
    F: FnMut(&BufferParser<'_>, usize, OsString) -> Result<DirEntry, ParseError>,
{
    let parser = BufferParser::new(buffer);
    let mut entries = Vec::new();
    if buffer.is_empty() {
        return Ok(entries);
    }

    let mut offset = 0;
    loop {
        let next = parser.read_u32_le(offset + next_at)? as usize;
        let name_len = parser.read_u32_le(offset + name_len_at)? as usize;
        if (next != 0 && next < name_at) || name_len % 2 != 0 {
            return Err(ParseError::InvalidEntryLength);
        }
        let name_bytes = parser.slice(offset + name_at, name_len)?;
        if next != 0 && name_at + name_len > next {
            return Err(ParseError::InvalidOffset);
        }

        let wide: Vec<u16> = name_bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if !is_wide_dot_or_dotdot(&wide) {
            entries.push(build(&parser, offset, os_from_wide(&wide))?);
        }

        if next == 0 {
            break;
        }
        offset = offset.checked_add(next).ok_or(ParseError::InvalidOffset)?;
    }
    Ok(entries)
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(nul) => &bytes[..nul],
        None => bytes,
    }
}

pub(crate) fn is_dot_or_dotdot(name: &[u8]) -> bool {
    name == b"." || name == b".."
}

fn is_wide_dot_or_dotdot(name: &[u16]) -> bool {
    const DOT: u16 = b'.' as u16;
    name == [DOT] || name == [DOT, DOT]
}

#[cfg(unix)]
pub(crate) fn os_from_bytes(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
pub(crate) fn os_from_bytes(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(windows)]
fn os_from_wide(wide: &[u16]) -> OsString {
    use std::os::windows::ffi::OsStringExt;
    OsString::from_wide(wide)
}

#[cfg(not(windows))]
fn os_from_wide(wide: &[u16]) -> OsString {
    OsString::from(String::from_utf16_lossy(wide))
}
