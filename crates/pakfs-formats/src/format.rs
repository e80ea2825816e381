//! Common interface implemented by every archive format

use std::fmt;

use crate::error::ParseError;
use crate::source::ByteSource;
use crate::table::EntryTable;

/// Static description of a registered format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Short format name used in errors and logs (e.g. `"GRP"`)
    pub name: &'static str,
    /// Usual file extension, lowercase, without the dot
    pub extension: &'static str,
    /// Human readable description
    pub description: &'static str,
    /// Whether entry lookups distinguish case
    pub case_sensitive: bool,
}

/// A read-only archive container format.
///
/// `sniff` is a cheap identification check; `parse` builds the full entry
/// table. Both seek to the start of the source themselves, so neither relies
/// on where the other left the cursor.
pub trait ArchiveFormat: Send + Sync + fmt::Debug {
    /// Description of the format.
    fn info(&self) -> FormatInfo;

    /// Whether `source` looks like this format.
    ///
    /// Read failures count as "no".
    fn sniff(&self, source: &mut ByteSource) -> bool;

    /// Parse the directory of `source` into an entry table.
    ///
    /// Parsing is all-or-nothing: on error no table exists.
    fn parse(&self, source: &mut ByteSource) -> Result<EntryTable, ParseError>;
}

/// Read `N` bytes at the start of `source`, or `None` if it is too short.
pub(crate) fn read_signature<const N: usize>(source: &mut ByteSource) -> Option<[u8; N]> {
    let mut sig = [0u8; N];
    source.seek_to(0).ok()?;
    source.read_bytes(&mut sig).ok()?;
    Some(sig)
}
