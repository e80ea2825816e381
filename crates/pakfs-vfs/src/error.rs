//! Search path error types

use std::io;
use thiserror::Error;

use pakfs_formats::{FormatError, SourceError};

/// Search path error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// No registered format recognized a mounted file.
    #[error("unrecognized archive format")]
    UnrecognizedFormat,

    /// A format claimed a mounted file but could not parse it.
    #[error("corrupt {format} archive: {reason}")]
    CorruptArchive {
        /// Format that claimed the file
        format: &'static str,
        /// What the parser found wrong
        reason: String,
    },

    /// A read crossed the end of a file or archive.
    #[error("read of {len} bytes at offset {offset} exceeds length {available}")]
    OutOfRange {
        /// Requested offset
        offset: u64,
        /// Requested length
        len: u64,
        /// Available length
        available: u64,
    },

    /// An archive names the same path twice.
    #[error("duplicate entry in {format} archive: {name}")]
    DuplicateEntry {
        /// Format that claimed the file
        format: &'static str,
        /// Colliding path
        name: String,
    },

    /// Path or mount identity not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write refused: no write target, or a read-only store owns the path.
    #[error("read-only: {0}")]
    ReadOnlyViolation(String),

    /// Mount point is malformed.
    #[error("invalid mount point: {0}")]
    InvalidMountPoint(String),

    /// Logical path is malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Configuration could not be loaded or applied.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a ReadOnlyViolation error.
    pub fn read_only(path: impl Into<String>) -> Self {
        Self::ReadOnlyViolation(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<SourceError> for VfsError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::OutOfRange {
                offset,
                len,
                available,
            } => Self::OutOfRange {
                offset,
                len,
                available,
            },
            SourceError::Io(e) => Self::Io(e),
        }
    }
}

/// Flatten the format taxonomy into the search path taxonomy.
impl From<FormatError> for VfsError {
    fn from(e: FormatError) -> Self {
        match e {
            FormatError::Source(e) => e.into(),
            FormatError::UnrecognizedFormat => Self::UnrecognizedFormat,
            FormatError::CorruptArchive { format, source } => Self::CorruptArchive {
                format,
                reason: source.to_string(),
            },
            FormatError::DuplicateEntry { format, name } => Self::DuplicateEntry { format, name },
            FormatError::NotFound(path) => Self::NotFound(path),
            FormatError::NotAFile(path) => Self::IsADirectory(path),
        }
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => Self::new(io::ErrorKind::NotFound, msg),
            VfsError::ReadOnlyViolation(msg) => Self::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::InvalidPath(msg) | VfsError::InvalidMountPoint(msg) => {
                Self::new(io::ErrorKind::InvalidInput, msg)
            }
            VfsError::NotADirectory(msg) => Self::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => Self::new(io::ErrorKind::IsADirectory, msg),
            e @ VfsError::OutOfRange { .. } => Self::new(io::ErrorKind::UnexpectedEof, e),
            e @ (VfsError::UnrecognizedFormat
            | VfsError::CorruptArchive { .. }
            | VfsError::DuplicateEntry { .. }) => Self::new(io::ErrorKind::InvalidData, e),
            VfsError::Config(msg) => Self::other(msg),
            VfsError::Io(e) => e,
        }
    }
}

/// Search path result type.
pub type VfsResult<T> = Result<T, VfsError>;
