//! SLB archives (Independence War)
//!
//! SLB has no signature. The header is a version word that must be zero,
//! followed by the entry count and the offset of the table of contents.
//! Each 72-byte TOC record starts with a `\`, then a 63-byte NUL-padded
//! name using `\` as separator, then the data offset and size.
//!
//! Because the header alone says so little, [`Slb::sniff`] also requires
//! the whole TOC to fit in the source and every record to start with `\`.

use binrw::BinRead;
use std::io::Cursor;

use crate::error::ParseError;
use crate::format::{ArchiveFormat, FormatInfo};
use crate::source::ByteSource;
use crate::table::{EntryTable, EntryTableBuilder};
use crate::utils::{SEPARATOR, decode_name, read_directory};

/// Header size in bytes.
pub const HEADER_SIZE: u64 = 12;

/// TOC record size in bytes.
pub const RECORD_SIZE: u64 = 72;

/// Separator used inside stored names.
pub const SLB_SEPARATOR: u8 = b'\\';

/// SLB header.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct SlbHeader {
    /// Format version, always 0
    pub version: u32,
    /// Number of TOC records
    pub entry_count: u32,
    /// Absolute offset of the TOC
    pub toc_offset: u32,
}

impl SlbHeader {
    fn is_plausible(&self) -> bool {
        self.version == 0 && self.entry_count > 0 && self.toc_offset > 0
    }
}

/// SLB TOC record.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct SlbRecord {
    /// Leading separator, always `\`
    pub separator: u8,
    /// NUL-padded name with `\` separators
    pub name: [u8; 63],
    /// Absolute data offset
    pub offset: u32,
    /// Data size in bytes
    pub size: u32,
}

impl SlbRecord {
    /// Stored name with `/` separators.
    pub fn name(&self) -> String {
        decode_name(&self.name).replace(char::from(SLB_SEPARATOR), &SEPARATOR.to_string())
    }
}

/// SLB format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Slb;

impl Slb {
    /// Header plus raw TOC, if the header is plausible and the TOC fits.
    fn read_toc(source: &mut ByteSource) -> Result<(SlbHeader, Vec<u8>), ParseError> {
        source.seek_to(0)?;
        let header = SlbHeader::read(source)?;
        if !header.is_plausible() {
            return Err(ParseError::InvalidHeader(format!(
                "version {}, {} entries, TOC at {}",
                header.version, header.entry_count, header.toc_offset
            )));
        }
        let toc = read_directory(
            source,
            u64::from(header.toc_offset),
            header.entry_count,
            RECORD_SIZE,
        )?;
        Ok((header, toc))
    }
}

fn records_start_with_separator(toc: &[u8]) -> bool {
    toc.chunks_exact(RECORD_SIZE as usize)
        .all(|record| record[0] == SLB_SEPARATOR)
}

impl ArchiveFormat for Slb {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "SLB",
            extension: "slb",
            description: "Independence War SLB",
            case_sensitive: false,
        }
    }

    fn sniff(&self, source: &mut ByteSource) -> bool {
        Self::read_toc(source).is_ok_and(|(_, toc)| records_start_with_separator(&toc))
    }

    fn parse(&self, source: &mut ByteSource) -> Result<EntryTable, ParseError> {
        let (header, toc) = Self::read_toc(source)?;
        let mut records = Cursor::new(toc);
        let mut builder = EntryTableBuilder::new(source.len(), self.info().case_sensitive);

        for _ in 0..header.entry_count {
            let record = SlbRecord::read(&mut records)?;
            if record.separator != SLB_SEPARATOR {
                return Err(ParseError::InvalidName {
                    name: record.name(),
                    reason: "missing leading separator",
                });
            }
            builder.add_file(&record.name(), u64::from(record.offset), u64::from(record.size))?;
        }

        Ok(builder.finish())
    }
}
