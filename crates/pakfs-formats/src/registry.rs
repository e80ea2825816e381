//! Format dispatch: pick the parser that claims a source

use std::fmt;

use tracing::{debug, instrument};

use crate::Result;
use crate::error::{FormatError, ParseError};
use crate::format::{ArchiveFormat, FormatInfo};
use crate::grp::Grp;
use crate::mvl::Mvl;
use crate::slb::Slb;
use crate::source::ByteSource;
use crate::table::{EntryStat, EntryTable};
use crate::wad::Wad;

/// Ordered set of archive formats.
///
/// [`open`](Self::open) asks each format in registration order whether it
/// recognizes the source. The first one that does owns it: if its parse then
/// fails the source is corrupt, and no later format is tried.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ArchiveFormat>>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.formats.iter().map(|format| format.info().name))
            .finish()
    }
}

impl Default for FormatRegistry {
    /// GRP, MVL, WAD, then SLB, which has no signature and must come last.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Grp);
        registry.register(Mvl);
        registry.register(Wad);
        registry.register(Slb);
        registry
    }
}

impl FormatRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Append a format. It is tried after every format registered before it.
    pub fn register(&mut self, format: impl ArchiveFormat + 'static) -> &mut Self {
        self.formats.push(Box::new(format));
        self
    }

    /// Registered formats in dispatch order.
    pub fn supported(&self) -> Vec<FormatInfo> {
        self.formats.iter().map(|format| format.info()).collect()
    }

    /// First format whose sniff accepts `source`.
    pub fn identify(&self, source: &mut ByteSource) -> Option<&dyn ArchiveFormat> {
        self.formats
            .iter()
            .find(|format| format.sniff(source))
            .map(|format| &**format)
    }

    /// Identify and parse `source`.
    #[instrument(level = "debug", skip(self, source), fields(len = source.len()))]
    pub fn open(&self, mut source: ByteSource) -> Result<Archive> {
        let Some(format) = self.identify(&mut source) else {
            debug!("no format claimed source");
            return Err(FormatError::UnrecognizedFormat);
        };

        let info = format.info();
        debug!(format = info.name, "format claimed source");

        let table = format.parse(&mut source).map_err(|err| match err {
            ParseError::DuplicateEntry(name) => FormatError::DuplicateEntry {
                format: info.name,
                name,
            },
            other => FormatError::CorruptArchive {
                format: info.name,
                source: other,
            },
        })?;

        debug!(format = info.name, files = table.file_count(), "parsed archive");
        source.seek_to(0)?;
        Ok(Archive {
            format: info,
            table,
            source,
        })
    }
}

/// A parsed archive: its entry table plus the bytes it indexes.
#[derive(Debug, Clone)]
pub struct Archive {
    format: FormatInfo,
    table: EntryTable,
    source: ByteSource,
}

impl Archive {
    /// Format that parsed this archive.
    pub fn format(&self) -> FormatInfo {
        self.format
    }

    /// Entry table.
    pub fn table(&self) -> &EntryTable {
        &self.table
    }

    /// Whole-archive source.
    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    /// See [`EntryTable::stat`].
    pub fn stat(&self, path: &str) -> Option<EntryStat> {
        self.table.stat(path)
    }

    /// See [`EntryTable::enumerate`].
    pub fn enumerate(&self, dir: &str) -> Option<impl Iterator<Item = &str> + '_> {
        self.table.enumerate(dir)
    }

    /// Bounded view of one file's bytes.
    pub fn open(&self, path: &str) -> Result<ByteSource> {
        self.table.open_range(&self.source, path)
    }
}
