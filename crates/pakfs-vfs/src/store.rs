//! Backends that can be mounted into a search path

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use pakfs_formats::{Archive, ByteSource, EntryKind, EntryStat, FormatInfo};
use tracing::debug;

use crate::error::{VfsError, VfsResult};
use crate::path::{SEPARATOR, to_native};

/// What a store is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// A parsed archive
    Archive(FormatInfo),
    /// A native directory
    Directory,
}

/// A mounted backend.
///
/// Paths passed to a store are sanitized and relative to its mount point;
/// the empty path is the store's root.
pub trait Store: Send + Sync + fmt::Debug {
    /// Backing kind.
    fn kind(&self) -> StoreKind;

    /// Whether writes to this store are refused.
    fn is_read_only(&self) -> bool;

    /// Native directory behind the store, if any.
    fn native_root(&self) -> Option<&Path> {
        None
    }

    /// Size and kind of `path`, or `None` if absent.
    fn stat(&self, path: &str) -> Option<EntryStat>;

    /// Names directly under directory `path`, or `None` if it is not one.
    fn read_dir(&self, path: &str) -> Option<Vec<String>>;

    /// Open file `path` for reading.
    fn open_read(&self, path: &str) -> VfsResult<ByteSource>;
}

/// Store over a parsed archive.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    archive: Archive,
}

impl ArchiveStore {
    /// Wrap an opened archive.
    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }

    /// The wrapped archive.
    pub fn archive(&self) -> &Archive {
        &self.archive
    }
}

impl Store for ArchiveStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Archive(self.archive.format())
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn stat(&self, path: &str) -> Option<EntryStat> {
        self.archive.stat(path)
    }

    fn read_dir(&self, path: &str) -> Option<Vec<String>> {
        self.archive
            .enumerate(path)
            .map(|names| names.map(str::to_string).collect())
    }

    fn open_read(&self, path: &str) -> VfsResult<ByteSource> {
        Ok(self.archive.open(path)?)
    }
}

/// Store over a native directory.
///
/// Logical paths are joined under the root one segment at a time after
/// sanitizing, so `..` never reaches the filesystem. Unless symlinks are
/// permitted, any symlink along a path hides it.
///
/// The store itself is never written; writes to its paths land in the write
/// target, so it does not count as read-only.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    permit_symlinks: bool,
}

impl DirectoryStore {
    /// Store rooted at `root`.
    ///
    /// # Errors
    ///
    /// `NotFound` if `root` does not exist, `NotADirectory` if it is a file.
    pub fn new(root: impl Into<PathBuf>, permit_symlinks: bool) -> VfsResult<Self> {
        let root = root.into();
        let meta = fs::metadata(&root)
            .map_err(|_| VfsError::not_found(root.display().to_string()))?;
        if !meta.is_dir() {
            return Err(VfsError::not_a_directory(root.display().to_string()));
        }
        Ok(Self {
            root,
            permit_symlinks,
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Native path for `path`, or `None` if a forbidden symlink is in the way.
    fn native(&self, path: &str) -> Option<PathBuf> {
        if self.permit_symlinks {
            return Some(to_native(&self.root, path));
        }

        let mut native = self.root.clone();
        for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
            native.push(segment);
            if let Ok(meta) = fs::symlink_metadata(&native)
                && meta.file_type().is_symlink()
            {
                debug!(path = %native.display(), "refusing symlink");
                return None;
            }
        }
        Some(native)
    }
}

impl Store for DirectoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Directory
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn native_root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn stat(&self, path: &str) -> Option<EntryStat> {
        let meta = fs::metadata(self.native(path)?).ok()?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Some(EntryStat {
            size: if kind.is_file() { meta.len() } else { 0 },
            kind,
            read_only: false,
        })
    }

    fn read_dir(&self, path: &str) -> Option<Vec<String>> {
        let entries = fs::read_dir(self.native(path)?).ok()?;
        let names = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                self.permit_symlinks || !entry.file_type().is_ok_and(|t| t.is_symlink())
            })
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        Some(names)
    }

    fn open_read(&self, path: &str) -> VfsResult<ByteSource> {
        let native = self
            .native(path)
            .ok_or_else(|| VfsError::not_found(path))?;
        match fs::metadata(&native) {
            Ok(meta) if meta.is_dir() => Err(VfsError::is_a_directory(path)),
            Ok(_) => Ok(ByteSource::open_file(&native)?),
            Err(_) => Err(VfsError::not_found(path)),
        }
    }
}
