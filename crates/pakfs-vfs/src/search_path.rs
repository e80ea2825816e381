//! The search path: an ordered union of mounted stores
//!
//! Reads walk the mount list front to back and the first store holding a
//! path wins. Writes never touch a mounted store; they all go to the single
//! native write target.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use pakfs_formats::{ByteSource, EntryKind, EntryStat, FormatRegistry};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{VfsError, VfsResult};
use crate::path::{child_toward, sanitize, sanitize_mount_point, strip_mount, to_native};
use crate::store::{ArchiveStore, DirectoryStore, Store, StoreKind};
use crate::write::WriteStream;

/// Something that can be mounted.
#[derive(Debug, Clone)]
pub enum MountSource {
    /// A native directory or archive file.
    Path(PathBuf),
    /// An archive held in memory.
    Memory {
        /// Identity of the mount
        name: String,
        /// Archive bytes
        data: Bytes,
    },
    /// An archive over an existing byte source.
    Source {
        /// Identity of the mount
        name: String,
        /// Archive bytes
        source: ByteSource,
    },
}

impl MountSource {
    /// Mount a native path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Mount an in-memory archive under `name`.
    pub fn memory(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Memory {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Where a new mount goes in the search order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MountPosition {
    /// Searched before every existing mount.
    Prepend,
    /// Searched after every existing mount.
    #[default]
    Append,
}

/// Snapshot of one mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Canonical path for native mounts, the given name otherwise
    pub identity: String,
    /// Sanitized mount point, `""` for the root
    pub mount_point: String,
    /// Backing kind
    pub kind: StoreKind,
}

/// Result of [`SearchPath::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// File or directory
    pub kind: EntryKind,
    /// Whether the store providing this path refuses writes
    pub read_only: bool,
}

impl Metadata {
    /// Returns true for files.
    pub const fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true for directories.
    pub const fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

#[derive(Debug, Clone)]
struct Mount {
    identity: String,
    mount_point: String,
    store: Arc<dyn Store>,
}

impl Mount {
    fn info(&self) -> MountInfo {
        MountInfo {
            identity: self.identity.clone(),
            mount_point: self.mount_point.clone(),
            kind: self.store.kind(),
        }
    }

    /// Whether this mount is the write target directory.
    fn is_write_target(&self, target: Option<&Path>) -> bool {
        target.is_some_and(|target| self.store.native_root() == Some(target))
    }
}

enum Resolved {
    /// A store holds the path.
    Entry {
        mount: Mount,
        rel: String,
        stat: EntryStat,
    },
    /// The path is a strict ancestor of a mount point.
    MountAncestor { mount: Mount },
}

impl Resolved {
    fn mount(&self) -> &Mount {
        match self {
            Self::Entry { mount, .. } | Self::MountAncestor { mount } => mount,
        }
    }

    fn kind(&self) -> EntryKind {
        match self {
            Self::Entry { stat, .. } => stat.kind,
            Self::MountAncestor { .. } => EntryKind::Directory,
        }
    }
}

fn resolve(mounts: &[Mount], path: &str) -> Option<Resolved> {
    for mount in mounts {
        if let Some(rel) = strip_mount(path, &mount.mount_point) {
            if let Some(stat) = mount.store.stat(rel) {
                return Some(Resolved::Entry {
                    mount: mount.clone(),
                    rel: rel.to_string(),
                    stat,
                });
            }
        } else if child_toward(path, &mount.mount_point).is_some() {
            return Some(Resolved::MountAncestor {
                mount: mount.clone(),
            });
        }
    }
    None
}

#[derive(Debug, Default)]
struct State {
    mounts: Vec<Mount>,
    write_target: Option<PathBuf>,
    permit_symlinks: bool,
}

/// Ordered set of mounted stores plus an optional write target.
///
/// All methods take `&self`; the mount list sits behind a mutex that is only
/// held to read or change the list, never while parsing an archive or
/// touching the disk.
pub struct SearchPath {
    registry: FormatRegistry,
    state: Mutex<State>,
}

impl fmt::Debug for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchPath")
            .field("registry", &self.registry)
            .field("mounts", &"<locked>")
            .finish()
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new(FormatRegistry::default())
    }
}

impl SearchPath {
    /// Empty search path using `registry` to identify archives.
    pub fn new(registry: FormatRegistry) -> Self {
        Self {
            registry,
            state: Mutex::new(State::default()),
        }
    }

    /// Format registry used for mounts.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    fn snapshot(&self) -> (Vec<Mount>, Option<PathBuf>) {
        let state = self.state.lock();
        (state.mounts.clone(), state.write_target.clone())
    }

    fn is_mounted(&self, identity: &str) -> bool {
        self.state
            .lock()
            .mounts
            .iter()
            .any(|mount| mount.identity == identity)
    }

    /// Whether directories mounted from now on follow symlinks.
    pub fn permit_symlinks(&self, permit: bool) {
        self.state.lock().permit_symlinks = permit;
    }

    /// Add `source` to the search path at `mount_point`.
    ///
    /// Mounting an identity that is already mounted does nothing. On error
    /// the mount list is unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidMountPoint` for a malformed mount point
    /// - `NotFound` if a native path does not exist
    /// - `UnrecognizedFormat`, `CorruptArchive` or `DuplicateEntry` if an
    ///   archive cannot be indexed
    #[instrument(level = "debug", skip(self, source))]
    pub fn mount(
        &self,
        source: MountSource,
        mount_point: &str,
        position: MountPosition,
    ) -> VfsResult<()> {
        let mount_point = sanitize_mount_point(mount_point)?;

        let (identity, store) = match source {
            MountSource::Path(path) => {
                let canonical = fs::canonicalize(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => VfsError::not_found(path.display().to_string()),
                    _ => VfsError::Io(e),
                })?;
                let identity = canonical.display().to_string();
                if self.is_mounted(&identity) {
                    debug!(%identity, "already mounted");
                    return Ok(());
                }
                (identity, self.open_native(canonical)?)
            }
            MountSource::Memory { name, data } => {
                if self.is_mounted(&name) {
                    debug!(identity = %name, "already mounted");
                    return Ok(());
                }
                let archive = self.registry.open(ByteSource::from_bytes(data))?;
                (name, Arc::new(ArchiveStore::new(archive)) as Arc<dyn Store>)
            }
            MountSource::Source { name, source } => {
                if self.is_mounted(&name) {
                    debug!(identity = %name, "already mounted");
                    return Ok(());
                }
                let archive = self.registry.open(source)?;
                (name, Arc::new(ArchiveStore::new(archive)) as Arc<dyn Store>)
            }
        };

        let mut state = self.state.lock();
        if state.mounts.iter().any(|mount| mount.identity == identity) {
            debug!(%identity, "mounted concurrently");
            return Ok(());
        }

        info!(%identity, %mount_point, kind = ?store.kind(), ?position, "mounted");
        let mount = Mount {
            identity,
            mount_point,
            store,
        };
        match position {
            MountPosition::Prepend => state.mounts.insert(0, mount),
            MountPosition::Append => state.mounts.push(mount),
        }
        Ok(())
    }

    fn open_native(&self, path: PathBuf) -> VfsResult<Arc<dyn Store>> {
        if fs::metadata(&path)?.is_dir() {
            let permit_symlinks = self.state.lock().permit_symlinks;
            return Ok(Arc::new(DirectoryStore::new(path, permit_symlinks)?));
        }
        let archive = self.registry.open(ByteSource::open(&path)?)?;
        Ok(Arc::new(ArchiveStore::new(archive)))
    }

    /// Remove the mount named `identity`.
    ///
    /// Native paths may be given in any form that canonicalizes to the
    /// mounted identity. Open read handles stay valid. Unmounting the
    /// directory that is the write target also clears the write target.
    pub fn unmount(&self, identity: &str) -> VfsResult<()> {
        let canonical = fs::canonicalize(identity)
            .ok()
            .map(|path| path.display().to_string());

        let mut state = self.state.lock();
        let index = state
            .mounts
            .iter()
            .position(|mount| {
                mount.identity == identity || Some(&mount.identity) == canonical.as_ref()
            })
            .ok_or_else(|| VfsError::not_found(identity))?;
        let mount = state.mounts.remove(index);
        info!(identity = %mount.identity, "unmounted");

        if mount.is_write_target(state.write_target.as_deref()) {
            info!(identity = %mount.identity, "write target cleared");
            state.write_target = None;
        }
        Ok(())
    }

    /// Ordered snapshot of the mount list.
    pub fn mounts(&self) -> Vec<MountInfo> {
        self.state.lock().mounts.iter().map(Mount::info).collect()
    }

    /// Mount point of `identity`, if mounted.
    pub fn mount_point(&self, identity: &str) -> Option<String> {
        self.state
            .lock()
            .mounts
            .iter()
            .find(|mount| mount.identity == identity)
            .map(|mount| mount.mount_point.clone())
    }

    /// Set or clear the native directory that receives all writes.
    ///
    /// # Errors
    ///
    /// `NotFound` if the directory does not exist, `NotADirectory` if it is
    /// a file.
    pub fn set_write_target(&self, dir: Option<&Path>) -> VfsResult<()> {
        let target = match dir {
            Some(dir) => {
                let canonical = fs::canonicalize(dir)
                    .map_err(|_| VfsError::not_found(dir.display().to_string()))?;
                if !fs::metadata(&canonical)?.is_dir() {
                    return Err(VfsError::not_a_directory(dir.display().to_string()));
                }
                Some(canonical)
            }
            None => None,
        };

        info!(target = ?target, "write target changed");
        self.state.lock().write_target = target;
        Ok(())
    }

    /// Current write target.
    pub fn write_target(&self) -> Option<PathBuf> {
        self.state.lock().write_target.clone()
    }

    /// Size, kind and writability of `path`.
    pub fn stat(&self, path: &str) -> VfsResult<Metadata> {
        let path = sanitize(path)?;
        if path.is_empty() {
            return Ok(Metadata {
                size: 0,
                kind: EntryKind::Directory,
                read_only: true,
            });
        }
        let (mounts, _) = self.snapshot();
        let resolved = resolve(&mounts, &path).ok_or_else(|| VfsError::not_found(&path))?;
        Ok(match resolved {
            Resolved::Entry { stat, .. } => Metadata {
                size: stat.size,
                kind: stat.kind,
                read_only: stat.read_only,
            },
            Resolved::MountAncestor { .. } => Metadata {
                size: 0,
                kind: EntryKind::Directory,
                read_only: true,
            },
        })
    }

    /// Whether any mount holds `path`. The root always exists.
    pub fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    /// Whether `path` resolves to a directory.
    pub fn is_directory(&self, path: &str) -> bool {
        self.stat(path).is_ok_and(|meta| meta.is_dir())
    }

    /// Identity of the mount that wins resolution for `path`.
    pub fn real_dir(&self, path: &str) -> VfsResult<String> {
        let path = sanitize(path)?;
        let (mounts, _) = self.snapshot();
        resolve(&mounts, &path)
            .map(|resolved| resolved.mount().identity.clone())
            .ok_or_else(|| VfsError::not_found(path))
    }

    /// Sorted, de-duplicated names directly under `dir` across all mounts.
    ///
    /// # Errors
    ///
    /// `NotFound` if no mount has `dir`, `NotADirectory` if it is only ever a
    /// file.
    pub fn enumerate(&self, dir: &str) -> VfsResult<Vec<String>> {
        let dir = sanitize(dir)?;
        let (mounts, _) = self.snapshot();

        let mut names = BTreeSet::new();
        let mut found_dir = dir.is_empty();
        let mut found_file = false;

        for mount in &mounts {
            if let Some(child) = child_toward(&dir, &mount.mount_point) {
                names.insert(child.to_string());
                found_dir = true;
                continue;
            }
            let Some(rel) = strip_mount(&dir, &mount.mount_point) else {
                continue;
            };
            match mount.store.stat(rel) {
                Some(stat) if stat.kind.is_dir() => {
                    found_dir = true;
                    names.extend(mount.store.read_dir(rel).unwrap_or_default());
                }
                Some(_) => found_file = true,
                None => {}
            }
        }

        if found_dir {
            Ok(names.into_iter().collect())
        } else if found_file {
            Err(VfsError::not_a_directory(dir))
        } else {
            Err(VfsError::not_found(dir))
        }
    }

    /// Open the winning copy of file `path` for reading.
    ///
    /// The returned source implements `Read` and `Seek` and stays valid
    /// after its mount is removed.
    #[instrument(level = "debug", skip(self))]
    pub fn open_read(&self, path: &str) -> VfsResult<ByteSource> {
        let path = sanitize(path)?;
        let (mounts, _) = self.snapshot();
        match resolve(&mounts, &path) {
            Some(Resolved::Entry { mount, rel, stat }) if stat.kind.is_file() => {
                debug!(identity = %mount.identity, "resolved");
                mount.store.open_read(&rel)
            }
            Some(_) => Err(VfsError::is_a_directory(path)),
            None => Err(VfsError::not_found(path)),
        }
    }

    /// Native path under the write target for writing file or directory
    /// `path`.
    fn writable(&self, path: &str, want: EntryKind) -> VfsResult<PathBuf> {
        let (mounts, target) = self.snapshot();
        let Some(target) = target else {
            return Err(VfsError::read_only(format!("{path}: no write target")));
        };

        if let Some(resolved) = resolve(&mounts, path) {
            match (resolved.kind(), want) {
                (EntryKind::File, _) if resolved.mount().store.is_read_only() => {
                    return Err(VfsError::read_only(format!(
                        "{path}: provided by {}",
                        resolved.mount().identity
                    )));
                }
                (EntryKind::File, EntryKind::Directory) => {
                    return Err(VfsError::not_a_directory(path));
                }
                (EntryKind::Directory, EntryKind::File) => {
                    return Err(VfsError::is_a_directory(path));
                }
                _ => {}
            }
        }

        Ok(to_native(&target, path))
    }

    fn open_stream(&self, path: &str, append: bool) -> VfsResult<WriteStream> {
        let path = sanitize(path)?;
        if path.is_empty() {
            return Err(VfsError::is_a_directory("/"));
        }
        let native = self.writable(&path, EntryKind::File)?;
        debug!(%path, native = %native.display(), append, "opening for write");
        WriteStream::create(path, native, append)
    }

    /// Create or truncate file `path` in the write target.
    ///
    /// # Errors
    ///
    /// `ReadOnlyViolation` if there is no write target or a read-only mount
    /// provides a file at `path`.
    pub fn open_write(&self, path: &str) -> VfsResult<WriteStream> {
        self.open_stream(path, false)
    }

    /// Open file `path` in the write target for appending, creating it if
    /// needed.
    pub fn open_append(&self, path: &str) -> VfsResult<WriteStream> {
        self.open_stream(path, true)
    }

    /// Create directory `path`, and any missing parents, in the write target.
    ///
    /// Directories that already exist in archives merge with new ones.
    pub fn mkdir(&self, path: &str) -> VfsResult<()> {
        let path = sanitize(path)?;
        if path.is_empty() {
            return Ok(());
        }
        let native = self.writable(&path, EntryKind::Directory)?;
        fs::create_dir_all(&native)?;
        info!(%path, "created directory");
        Ok(())
    }

    /// Delete file or empty directory `path` from the write target.
    ///
    /// # Errors
    ///
    /// `ReadOnlyViolation` if there is no write target, or if `path` exists
    /// only in read-only mounts; `NotFound` if it exists nowhere.
    pub fn remove(&self, path: &str) -> VfsResult<()> {
        let path = sanitize(path)?;
        if path.is_empty() {
            return Err(VfsError::invalid_path("cannot remove the root"));
        }
        let (mounts, target) = self.snapshot();
        let Some(target) = target else {
            return Err(VfsError::read_only(format!("{path}: no write target")));
        };

        let resolved = resolve(&mounts, &path);
        if let Some(resolved) = &resolved
            && resolved.kind().is_file()
            && resolved.mount().store.is_read_only()
        {
            return Err(VfsError::read_only(format!(
                "{path}: provided by {}",
                resolved.mount().identity
            )));
        }

        let native = to_native(&target, &path);
        match fs::symlink_metadata(&native) {
            Ok(meta) => {
                if meta.is_dir() {
                    fs::remove_dir(&native)?;
                } else {
                    fs::remove_file(&native)?;
                }
                info!(%path, "removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match resolved {
                    Some(resolved) => Err(VfsError::read_only(format!(
                        "{path}: provided by {}",
                        resolved.mount().identity
                    ))),
                    None => Err(VfsError::not_found(path)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn grp(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = b"KenSilverman".to_vec();
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (name, data) in entries {
            let mut field = [b' '; 12];
            field[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&field);
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        for (_, data) in entries {
            out.extend_from_slice(data);
        }
        out
    }

    fn read(vfs: &SearchPath, path: &str) -> Vec<u8> {
        vfs.open_read(path).unwrap().read_to_vec().unwrap()
    }

    #[test]
    fn test_first_mount_wins() {
        let vfs = SearchPath::default();
        vfs.mount(MountSource::memory("x", grp(&[("A.TXT", b"x")])), "", MountPosition::Append)
            .unwrap();
        vfs.mount(MountSource::memory("y", grp(&[("A.TXT", b"y")])), "", MountPosition::Append)
            .unwrap();
        assert_eq!(read(&vfs, "a.txt"), b"x");
        assert_eq!(vfs.real_dir("a.txt").unwrap(), "x");

        vfs.unmount("x").unwrap();
        assert_eq!(read(&vfs, "a.txt"), b"y");
    }

    #[test]
    fn test_prepend() {
        let vfs = SearchPath::default();
        vfs.mount(MountSource::memory("x", grp(&[("A.TXT", b"x")])), "", MountPosition::Append)
            .unwrap();
        vfs.mount(MountSource::memory("y", grp(&[("A.TXT", b"y")])), "", MountPosition::Prepend)
            .unwrap();
        assert_eq!(read(&vfs, "A.TXT"), b"y");
        let order: Vec<_> = vfs.mounts().into_iter().map(|m| m.identity).collect();
        assert_eq!(order, ["y", "x"]);
    }

    #[test]
    fn test_mount_point_prefix_and_ancestors() {
        let vfs = SearchPath::default();
        vfs.mount(
            MountSource::memory("mod", grp(&[("MAP.DAT", b"m")])),
            "/mods/extra/",
            MountPosition::Append,
        )
        .unwrap();

        assert_eq!(vfs.mount_point("mod").unwrap(), "mods/extra");
        assert_eq!(read(&vfs, "mods/extra/map.dat"), b"m");
        assert!(vfs.open_read("map.dat").is_err());
        assert!(vfs.is_directory("mods"));
        assert!(vfs.is_directory("mods/extra"));
        assert_eq!(vfs.enumerate("").unwrap(), ["mods"]);
        assert_eq!(vfs.enumerate("mods").unwrap(), ["extra"]);
        assert_eq!(vfs.enumerate("mods/extra").unwrap(), ["MAP.DAT"]);
        assert!(matches!(vfs.open_read("mods"), Err(VfsError::IsADirectory(_))));
    }

    #[test]
    fn test_unmount_unknown() {
        let vfs = SearchPath::default();
        assert!(matches!(vfs.unmount("nothing"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_stat_root_of_empty_search_path() {
        let vfs = SearchPath::default();
        let meta = vfs.stat("").unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.size, 0);
        assert_eq!(vfs.stat("/").unwrap(), meta);
        assert!(vfs.exists(""));
        assert!(vfs.is_directory(""));
        assert!(vfs.enumerate("").unwrap().is_empty());
    }

    #[test]
    fn test_write_target_round_trip() {
        let dir = TempDir::new().unwrap();
        let vfs = SearchPath::default();
        vfs.set_write_target(Some(dir.path())).unwrap();
        vfs.mount(MountSource::path(dir.path()), "", MountPosition::Append)
            .unwrap();

        vfs.mkdir("saves/slot1").unwrap();
        let mut stream = vfs.open_write("saves/slot1/game.sav").unwrap();
        stream.write_all(b"state").unwrap();
        stream.finish().unwrap();

        let meta = vfs.stat("saves/slot1/game.sav").unwrap();
        assert_eq!(meta.size, 5);
        assert!(!meta.read_only);

        let mut stream = vfs.open_append("saves/slot1/game.sav").unwrap();
        stream.write_all(b"+").unwrap();
        stream.finish().unwrap();
        assert_eq!(read(&vfs, "saves/slot1/game.sav"), b"state+");

        vfs.remove("saves/slot1/game.sav").unwrap();
        assert!(!vfs.exists("saves/slot1/game.sav"));
        assert!(matches!(
            vfs.remove("saves/slot1/game.sav"),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_write_target_validates() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"").unwrap();
        let vfs = SearchPath::default();
        assert!(matches!(
            vfs.set_write_target(Some(file.as_path())),
            Err(VfsError::NotADirectory(_))
        ));
        assert!(matches!(
            vfs.set_write_target(Some(dir.path().join("missing").as_path())),
            Err(VfsError::NotFound(_))
        ));
        assert!(vfs.write_target().is_none());
    }
}
