//! Error types for fastdir.

use std::fmt;
use std::io;

/// Error type for directory enumeration.
#[derive(Debug)]
pub enum Error {
    /// Failed to open the directory.
    Open(io::Error),
    /// The batched directory read failed.
    Syscall(io::Error),
    /// The kernel buffer failed a bounds or length check.
    Parse(String),
    /// The name filter could not be compiled or passed to the kernel.
    Pattern(String),
    /// The batch buffer of this many bytes could not be reserved.
    Alloc(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Open(e) => write!(f, "failed to open directory: {}", e),
            Error::Syscall(e) => write!(f, "directory read failed: {}", e),
            Error::Parse(msg) => write!(f, "record parse error: {}", msg),
            Error::Pattern(msg) => write!(f, "invalid name filter: {}", msg),
            Error::Alloc(bytes) => write!(f, "could not allocate a {} byte batch buffer", bytes),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open(e) | Error::Syscall(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Syscall(e)
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Self {
        Error::Pattern(e.to_string())
    }
}

/// Internal parse error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseError {
    /// A fixed-size field runs past the end of the buffer.
    UnexpectedEnd,
    /// A record length or next-entry offset is zero or too small for its header.
    InvalidEntryLength,
    /// A record, or the name inside it, extends past the valid data.
    InvalidOffset,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEnd => write!(f, "unexpected end of buffer"),
            ParseError::InvalidEntryLength => write!(f, "invalid record length"),
            ParseError::InvalidOffset => write!(f, "record extends past valid data"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e.to_string())
    }
}
