//! Error types for archive parsing and byte source access

use std::io;
use thiserror::Error;

/// Result type for format operations.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors raised by [`ByteSource`](crate::ByteSource) reads, seeks and slices.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A read, seek or slice crossed the end of the source.
    #[error("Out of range: {offset} + {len} exceeds source length {available}")]
    OutOfRange {
        /// Requested start offset
        offset: u64,
        /// Requested length in bytes
        len: u64,
        /// Length of the source
        available: u64,
    },

    /// The backing store failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<SourceError> for io::Error {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::OutOfRange { .. } => {
                Self::new(io::ErrorKind::UnexpectedEof, e.to_string())
            }
            SourceError::Io(e) => e,
        }
    }
}

/// Errors raised while a format parser walks an archive it has claimed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Reading the header or directory failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Fixed-layout header or record could not be decoded.
    #[error("Binary format error: {0}")]
    BinRead(#[from] binrw::Error),

    /// Header fields are inconsistent with the source.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The directory region lies (partly) outside the source.
    #[error("Directory of {len} bytes at offset {offset} exceeds source length {available}")]
    TruncatedDirectory {
        /// Directory start offset
        offset: u64,
        /// Directory length in bytes
        len: u64,
        /// Length of the source
        available: u64,
    },

    /// An entry's data range lies (partly) outside the source.
    #[error("Entry {name} at {offset} + {size} exceeds source length {available}")]
    EntryOutOfRange {
        /// Entry name as stored
        name: String,
        /// Declared data offset
        offset: u64,
        /// Declared data size
        size: u64,
        /// Length of the source
        available: u64,
    },

    /// An entry name is empty or contains forbidden segments.
    #[error("Invalid entry name {name:?}: {reason}")]
    InvalidName {
        /// Entry name as stored
        name: String,
        /// Why the name was rejected
        reason: &'static str,
    },

    /// Two entries normalize to the same path.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),
}

/// Errors surfaced by the format registry and opened archives.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Reading from a byte source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// No registered parser recognized the input.
    #[error("Unrecognized archive format")]
    UnrecognizedFormat,

    /// A parser claimed the input but its header or directory is inconsistent.
    #[error("Corrupt {format} archive: {source}")]
    CorruptArchive {
        /// Name of the format that claimed the input
        format: &'static str,
        /// What the parser found wrong
        source: ParseError,
    },

    /// The archive defines the same path twice.
    #[error("Duplicate entry in {format} archive: {name}")]
    DuplicateEntry {
        /// Name of the format that claimed the input
        format: &'static str,
        /// Colliding path
        name: String,
    },

    /// Path is not present in the archive.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Path names a directory where a file was expected.
    #[error("Not a file: {0}")]
    NotAFile(String),
}

impl FormatError {
    /// Check whether the error means "try another parser or path".
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::UnrecognizedFormat)
    }

    /// Check whether the error was raised while parsing a claimed archive.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptArchive { .. } | Self::DuplicateEntry { .. })
    }
}
