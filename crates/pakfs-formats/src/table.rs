//! Unified entry table shared by every archive format
//!
//! Parsers feed `(name, offset, size)` triples into an [`EntryTableBuilder`].
//! The builder normalizes names, bounds-checks data ranges against the
//! source, rejects collisions, and synthesizes a directory entry for every
//! parent path. The finished [`EntryTable`] is immutable.
//!
//! Lookups fold case when the table is case-insensitive; the stored spelling
//! is what enumeration returns.

use std::collections::BTreeMap;

use crate::error::{FormatError, ParseError, Result};
use crate::source::ByteSource;
use crate::utils::{SEPARATOR, normalize_entry_path};

/// Kind of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Data stored in the archive.
    File,
    /// Directory implied by the paths of other entries.
    Directory,
}

impl EntryKind {
    /// Returns true for files.
    pub const fn is_file(self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns true for directories.
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One path in an archive.
///
/// For directories `offset` and `size` are always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Normalized path as stored in the archive
    pub name: String,
    /// Data offset in the archive source
    pub offset: u64,
    /// Data size in bytes
    pub size: u64,
    /// File or directory
    pub kind: EntryKind,
}

impl Entry {
    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.name
            .rsplit_once(SEPARATOR)
            .map_or(self.name.as_str(), |(_, last)| last)
    }
}

/// Result of [`EntryTable::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// File or directory
    pub kind: EntryKind,
    /// Always true: archive entries cannot be modified
    pub read_only: bool,
}

/// Builds an [`EntryTable`] from parsed directory records.
#[derive(Debug)]
pub struct EntryTableBuilder {
    source_len: u64,
    case_sensitive: bool,
    entries: BTreeMap<String, Entry>,
    file_count: usize,
}

impl EntryTableBuilder {
    /// Start a table for a source of `source_len` bytes.
    pub fn new(source_len: u64, case_sensitive: bool) -> Self {
        Self {
            source_len,
            case_sensitive,
            entries: BTreeMap::new(),
            file_count: 0,
        }
    }

    fn key(&self, path: &str) -> String {
        fold(path, self.case_sensitive)
    }

    /// Add a file entry and synthesize its parent directories.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if the name is empty or contains `.`/`..` segments
    /// - `EntryOutOfRange` if `offset + size` exceeds the source length
    /// - `DuplicateEntry` if the path, or one of its parents, already names
    ///   an entry of a conflicting kind
    pub fn add_file(
        &mut self,
        name: &str,
        offset: u64,
        size: u64,
    ) -> std::result::Result<(), ParseError> {
        let path = normalize_entry_path(name)?;

        match offset.checked_add(size) {
            Some(end) if end <= self.source_len => {}
            _ => {
                return Err(ParseError::EntryOutOfRange {
                    name: path,
                    offset,
                    size,
                    available: self.source_len,
                });
            }
        }

        let key = self.key(&path);
        if self.entries.contains_key(&key) {
            return Err(ParseError::DuplicateEntry(path));
        }

        // Walk parents before inserting anything so a conflict leaves no trace.
        let parents: Vec<&str> = path
            .match_indices(SEPARATOR)
            .map(|(idx, _)| &path[..idx])
            .collect();
        for parent in &parents {
            if let Some(existing) = self.entries.get(&self.key(parent))
                && existing.kind.is_file()
            {
                return Err(ParseError::DuplicateEntry((*parent).to_string()));
            }
        }

        for parent in parents {
            let parent_key = self.key(parent);
            self.entries.entry(parent_key).or_insert_with(|| Entry {
                name: parent.to_string(),
                offset: 0,
                size: 0,
                kind: EntryKind::Directory,
            });
        }

        self.entries.insert(
            key,
            Entry {
                name: path,
                offset,
                size,
                kind: EntryKind::File,
            },
        );
        self.file_count += 1;
        Ok(())
    }

    /// Freeze the table.
    pub fn finish(self) -> EntryTable {
        EntryTable {
            entries: self.entries,
            case_sensitive: self.case_sensitive,
            file_count: self.file_count,
        }
    }
}

/// Immutable path index of one archive.
#[derive(Debug, Clone)]
pub struct EntryTable {
    entries: BTreeMap<String, Entry>,
    case_sensitive: bool,
    file_count: usize,
}

impl EntryTable {
    /// Whether lookups distinguish case.
    pub const fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Number of file entries.
    pub const fn file_count(&self) -> usize {
        self.file_count
    }

    /// Number of entries including synthesized directories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup key for a query path, or `None` if the path can never match.
    ///
    /// The empty string (and `/`) is the root directory.
    fn lookup_key(&self, path: &str) -> Option<String> {
        let trimmed = path.trim_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Some(String::new());
        }
        normalize_entry_path(trimmed)
            .ok()
            .map(|p| fold(&p, self.case_sensitive))
    }

    /// Entry stored under `path`. The root has no entry.
    pub fn entry(&self, path: &str) -> Option<&Entry> {
        self.lookup_key(path).and_then(|key| self.entries.get(&key))
    }

    /// Size and kind of `path`; the root is a directory.
    pub fn stat(&self, path: &str) -> Option<EntryStat> {
        let key = self.lookup_key(path)?;
        if key.is_empty() {
            return Some(EntryStat {
                size: 0,
                kind: EntryKind::Directory,
                read_only: true,
            });
        }
        self.entries.get(&key).map(|entry| EntryStat {
            size: entry.size,
            kind: entry.kind,
            read_only: true,
        })
    }

    /// Immediate children of directory `dir`.
    ///
    /// Returns `None` if `dir` is missing or is a file. The iterator borrows
    /// the table and can be requested again at any time.
    pub fn enumerate(&self, dir: &str) -> Option<impl Iterator<Item = &str> + '_> {
        let key = self.lookup_key(dir)?;
        let prefix = if key.is_empty() {
            String::new()
        } else {
            if !self.entries.get(&key)?.kind.is_dir() {
                return None;
            }
            format!("{key}{SEPARATOR}")
        };
        let skip = prefix.len();

        // Keys sharing a prefix are contiguous in the map.
        Some(
            self.entries
                .range(prefix.clone()..)
                .take_while(move |(k, _)| k.starts_with(prefix.as_str()))
                .filter(move |(k, _)| !k[skip..].contains(SEPARATOR))
                .map(|(_, entry)| entry.file_name()),
        )
    }

    /// File entries in path order.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values().filter(|e| e.kind.is_file())
    }

    /// Restricted view of the bytes of file `path` within `source`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the path is absent
    /// - `NotAFile` if the path is a directory
    pub fn open_range(&self, source: &ByteSource, path: &str) -> Result<ByteSource> {
        let entry = self
            .entry(path)
            .ok_or_else(|| FormatError::NotFound(path.to_string()))?;
        if entry.kind.is_dir() {
            return Err(FormatError::NotAFile(path.to_string()));
        }
        Ok(source.slice(entry.offset, entry.size)?)
    }
}

fn fold(path: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        path.to_string()
    } else {
        path.to_ascii_lowercase()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use pretty_assertions::assert_eq;

    fn table(files: &[(&str, u64, u64)], case_sensitive: bool) -> EntryTable {
        let mut builder = EntryTableBuilder::new(1024, case_sensitive);
        for (name, offset, size) in files {
            builder.add_file(name, *offset, *size).expect("add");
        }
        builder.finish()
    }

    fn children(table: &EntryTable, dir: &str) -> Vec<String> {
        table
            .enumerate(dir)
            .expect("directory")
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_directories_are_synthesized() {
        let table = table(&[("a/b/c.txt", 0, 4)], false);
        assert_eq!(table.len(), 3);
        assert_eq!(table.file_count(), 1);

        assert_eq!(children(&table, ""), vec!["a"]);
        assert_eq!(children(&table, "a"), vec!["b"]);
        assert_eq!(children(&table, "a/b"), vec!["c.txt"]);

        let dir = table.stat("a/b").expect("stat");
        assert_eq!(dir.kind, EntryKind::Directory);
        assert_eq!(dir.size, 0);
        assert!(dir.read_only);
    }

    #[test]
    fn test_enumerate_does_not_leak_siblings() {
        let table = table(
            &[
                ("a/x", 0, 1),
                ("a-b/y", 0, 1),
                ("a/sub/z", 0, 1),
                ("ab", 0, 1),
            ],
            true,
        );
        assert_eq!(children(&table, "a"), vec!["sub", "x"]);
        assert_eq!(children(&table, ""), vec!["a", "a-b", "ab"]);
    }

    #[test]
    fn test_enumerate_is_restartable() {
        let table = table(&[("maps/e1m1.map", 0, 8), ("maps/e1m2.map", 8, 8)], false);
        let first: Vec<_> = table.enumerate("maps").expect("dir").collect();
        let second: Vec<_> = table.enumerate("maps").expect("dir").collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_enumerate_file_or_missing_is_none() {
        let table = table(&[("a/b.txt", 0, 1)], false);
        assert!(table.enumerate("a/b.txt").is_none());
        assert!(table.enumerate("nope").is_none());
    }

    #[test]
    fn test_case_insensitive_lookup_keeps_spelling() {
        let table = table(&[("Maps/E1M1.MAP", 0, 16)], false);
        let stat = table.stat("maps/e1m1.map").expect("stat");
        assert_eq!(stat.size, 16);
        assert_eq!(table.entry("MAPS/e1m1.map").expect("entry").name, "Maps/E1M1.MAP");
        assert_eq!(children(&table, "MAPS"), vec!["E1M1.MAP"]);
    }

    #[test]
    fn test_case_sensitive_lookup() {
        let table = table(&[("Readme.txt", 0, 1)], true);
        assert!(table.stat("Readme.txt").is_some());
        assert!(table.stat("readme.txt").is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut builder = EntryTableBuilder::new(100, false);
        builder.add_file("A.TXT", 0, 1).expect("add");
        assert!(matches!(
            builder.add_file("a.txt", 1, 1),
            Err(ParseError::DuplicateEntry(_))
        ));
    }

    #[test]
    fn test_file_directory_collision_rejected() {
        let mut builder = EntryTableBuilder::new(100, true);
        builder.add_file("a", 0, 1).expect("add");
        assert!(matches!(
            builder.add_file("a/b", 1, 1),
            Err(ParseError::DuplicateEntry(name)) if name == "a"
        ));

        let mut builder = EntryTableBuilder::new(100, true);
        builder.add_file("a/b", 0, 1).expect("add");
        assert!(matches!(
            builder.add_file("a", 1, 1),
            Err(ParseError::DuplicateEntry(_))
        ));
    }

    #[test]
    fn test_failed_add_leaves_no_directories() {
        let mut builder = EntryTableBuilder::new(100, true);
        builder.add_file("p/f", 0, 1).expect("add");
        assert!(builder.add_file("p/f/g/h", 1, 1).is_err());
        assert!(builder.add_file("y/z", 0, 1000).is_err());
        let table = builder.finish();
        assert!(table.stat("p/f/g").is_none());
        assert!(table.stat("y").is_none());
        assert_eq!(table.file_count(), 1);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut builder = EntryTableBuilder::new(16, false);
        builder.add_file("fits", 12, 4).expect("add");
        assert!(matches!(
            builder.add_file("past", 13, 4),
            Err(ParseError::EntryOutOfRange { .. })
        ));
        assert!(matches!(
            builder.add_file("wraps", u64::MAX, 2),
            Err(ParseError::EntryOutOfRange { .. })
        ));
    }

    #[test]
    fn test_root_stat() {
        let table = EntryTableBuilder::new(0, false).finish();
        assert!(table.is_empty());
        assert_eq!(table.stat("").expect("root").kind, EntryKind::Directory);
        assert_eq!(table.enumerate("/").expect("root").count(), 0);
    }

    #[test]
    fn test_open_range() {
        let source = ByteSource::from_bytes(b"headerDATAtail".to_vec());
        let mut builder = EntryTableBuilder::new(source.len(), false);
        builder.add_file("dir/data.bin", 6, 4).expect("add");
        let table = builder.finish();

        let mut slice = table.open_range(&source, "dir/data.bin").expect("open");
        assert_eq!(slice.read_to_vec().expect("read"), b"DATA");

        assert!(matches!(
            table.open_range(&source, "dir"),
            Err(FormatError::NotAFile(_))
        ));
        assert!(matches!(
            table.open_range(&source, "missing"),
            Err(FormatError::NotFound(_))
        ));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z]{1,4}"
    }

    fn path() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("/"))
    }

    proptest! {
        /// Every stored file is reachable by stat and listed by its parent
        #[test]
        fn files_are_listed_by_parent(paths in prop::collection::btree_set(path(), 1..20)) {
            let mut builder = EntryTableBuilder::new(u64::MAX, true);
            let mut added = Vec::new();
            for (i, p) in paths.iter().enumerate() {
                if builder.add_file(p, i as u64, 1).is_ok() {
                    added.push(p.clone());
                }
            }
            let table = builder.finish();
            prop_assert_eq!(table.file_count(), added.len());

            for p in &added {
                let stat = table.stat(p).expect("stat");
                prop_assert_eq!(stat.kind, EntryKind::File);
                let (parent, leaf) = p.rsplit_once('/').unwrap_or(("", p.as_str()));
                let listed: Vec<&str> = table.enumerate(parent).expect("parent").collect();
                prop_assert!(listed.contains(&leaf));
            }
        }

        /// Children never contain a separator
        #[test]
        fn children_are_single_segments(paths in prop::collection::btree_set(path(), 1..20)) {
            let mut builder = EntryTableBuilder::new(u64::MAX, false);
            for p in &paths {
                let _ = builder.add_file(p, 0, 0);
            }
            let table = builder.finish();
            for entry in table.entries.values().filter(|e| e.kind.is_dir()) {
                for child in table.enumerate(&entry.name).expect("dir") {
                    prop_assert!(!child.contains('/'));
                    let full = format!("{}/{}", entry.name, child);
                    prop_assert!(table.stat(&full).is_some());
                }
            }
        }
    }
}
