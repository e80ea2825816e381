//! Bounded random-access byte sources
//!
//! Every parser and every consumer of archive contents reads through a
//! [`ByteSource`]: a cheap-to-clone view over a backing store with its own
//! cursor. Views are strict. A read, seek or slice that would cross the end
//! of the view fails with [`SourceError::OutOfRange`] instead of returning
//! fewer bytes.
//!
//! Backing stores implement [`ReadAt`]:
//!
//! - [`MemoryBacking`]: shared in-memory buffer (`bytes::Bytes`)
//! - [`MappedFile`]: memory-mapped archive file
//! - [`FileBacking`]: positional reads on an open file handle
//!
//! ```text
//! backing:  |..........................................|
//! view:               |base ........ base+len|
//! cursor:                      ^pos
//! ```

use bytes::Bytes;
use memmap2::{Mmap, MmapOptions};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SourceError;

/// Result type for byte source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Positional, length-bounded read access to a backing store.
pub trait ReadAt: Send + Sync + fmt::Debug {
    /// Total length of the backing store in bytes.
    fn len(&self) -> u64;

    /// Whether the backing store holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Callers guarantee `offset + buf.len() <= self.len()`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// Shared in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemoryBacking {
    data: Bytes,
}

impl MemoryBacking {
    /// Wrap a buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl ReadAt for MemoryBacking {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset too large"))?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end"))?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Memory-mapped file.
pub struct MappedFile {
    path: PathBuf,
    mmap: Mmap,
}

impl fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}

impl MappedFile {
    /// Map a file read-only.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or mapped
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;

        // Archives are immutable once mounted; the mapping is never written.
        #[allow(unsafe_code)]
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Path the mapping was created from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadAt for MappedFile {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset too large"))?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.mmap.get(start..end))
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end"))?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Open file read with positional I/O.
///
/// Used for loose files in real directories, which may be rewritten while a
/// reader holds them, so they are not mapped.
#[derive(Debug)]
pub struct FileBacking {
    path: PathBuf,
    file: File,
    len: u64,
}

impl FileBacking {
    /// Open a file and record its current length.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or its metadata read
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
        })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadAt for FileBacking {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut done = 0;
            while done < buf.len() {
                let n = self.file.seek_read(&mut buf[done..], offset + done as u64)?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "file shrank while reading",
                    ));
                }
                done += n;
            }
            Ok(())
        }

        #[cfg(not(any(unix, windows)))]
        {
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(buf)
        }
    }
}

/// Bounded view over a [`ReadAt`] backing store with an independent cursor.
///
/// Cloning is cheap and yields a view with its own cursor. A view keeps its
/// backing store alive, so slices handed out by an archive stay valid after
/// the archive itself is dropped.
#[derive(Clone)]
pub struct ByteSource {
    backing: Arc<dyn ReadAt>,
    base: u64,
    len: u64,
    pos: u64,
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("backing", &self.backing)
            .field("base", &self.base)
            .field("len", &self.len)
            .field("pos", &self.pos)
            .finish()
    }
}

impl ByteSource {
    /// View the whole of a backing store.
    pub fn new(backing: Arc<dyn ReadAt>) -> Self {
        let len = backing.len();
        Self {
            backing,
            base: 0,
            len,
            pos: 0,
        }
    }

    /// View an in-memory buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(Arc::new(MemoryBacking::new(data)))
    }

    /// Memory-map an archive file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or mapped
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let len = std::fs::metadata(path)?.len();
        if len == 0 {
            return Ok(Self::from_bytes(Bytes::new()));
        }
        Ok(Self::new(Arc::new(MappedFile::open(path)?)))
    }

    /// Open a file for positional reads without mapping it.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened
    pub fn open_file(path: impl AsRef<Path>) -> SourceResult<Self> {
        Ok(Self::new(Arc::new(FileBacking::open(path.as_ref())?)))
    }

    /// Length of this view in bytes.
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Whether this view holds no bytes.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current cursor position relative to the start of the view.
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes between the cursor and the end of the view.
    pub const fn remaining(&self) -> u64 {
        self.len - self.pos
    }

    fn check(&self, offset: u64, len: u64) -> SourceResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(SourceError::OutOfRange {
                offset,
                len,
                available: self.len,
            }),
        }
    }

    /// Move the cursor to `pos`.
    ///
    /// Seeking to exactly the end is allowed; beyond it is not.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `pos` exceeds the view length
    pub fn seek_to(&mut self, pos: u64) -> SourceResult<()> {
        self.check(pos, 0)?;
        self.pos = pos;
        Ok(())
    }

    /// Fill `buf` from `offset` without touching the cursor.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the request crosses the end of the view
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> SourceResult<()> {
        self.check(offset, buf.len() as u64)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.backing.read_exact_at(self.base + offset, buf)?;
        Ok(())
    }

    /// Fill `buf` from the cursor and advance it.
    ///
    /// On failure the cursor does not move.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the request crosses the end of the view
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> SourceResult<()> {
        self.read_at(self.pos, buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read everything from the cursor to the end of the view.
    ///
    /// # Errors
    ///
    /// Returns error if the view is too large for memory or the backing fails
    pub fn read_to_vec(&mut self) -> SourceResult<Vec<u8>> {
        let remaining = self.remaining();
        let len = usize::try_from(remaining).map_err(|_| SourceError::OutOfRange {
            offset: self.pos,
            len: remaining,
            available: self.len,
        })?;
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    /// Restricted view of `size` bytes starting at `offset`.
    ///
    /// The slice has its own cursor at 0 and cannot reach outside its range.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the range crosses the end of this view
    pub fn slice(&self, offset: u64, size: u64) -> SourceResult<Self> {
        self.check(offset, size)?;
        Ok(Self {
            backing: Arc::clone(&self.backing),
            base: self.base + offset,
            len: size,
            pos: 0,
        })
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(usize::try_from(self.remaining()).unwrap_or(usize::MAX));
        self.read_bytes(&mut buf[..n])?;
        Ok(n)
    }
}

impl Seek for ByteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of source")
        })?;
        self.seek_to(target)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        Ok(target)
    }
}
