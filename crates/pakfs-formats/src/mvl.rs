//! MVL movie libraries (Descent 2)
//!
//! Layout (all integers little-endian):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 4    | Signature `DMVL` |
//! | 0x04   | 4    | Entry count |
//! | 0x08   | 17 * count | Records: 13-byte NUL-padded name, 4-byte size |
//! | ...    | ...  | File data, back-to-back in record order |

use binrw::BinRead;
use std::io::Cursor;

use crate::error::ParseError;
use crate::format::{ArchiveFormat, FormatInfo, read_signature};
use crate::source::ByteSource;
use crate::table::{EntryTable, EntryTableBuilder};
use crate::utils::{decode_name, read_directory};

/// MVL signature.
pub const MVL_SIGNATURE: [u8; 4] = *b"DMVL";

/// Header size in bytes.
pub const HEADER_SIZE: u64 = 8;

/// Directory record size in bytes.
pub const RECORD_SIZE: u64 = 17;

/// MVL header.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little, magic = b"DMVL")]
pub struct MvlHeader {
    /// Number of directory records
    pub entry_count: u32,
}

/// MVL directory record.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct MvlRecord {
    /// NUL-padded name
    pub name: [u8; 13],
    /// Data size in bytes
    pub size: u32,
}

impl MvlRecord {
    /// Stored name without padding.
    ///
    /// The last byte always terminates the name, even when it is not NUL.
    pub fn name(&self) -> String {
        decode_name(&self.name[..12])
    }
}

/// MVL format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mvl;

impl ArchiveFormat for Mvl {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "MVL",
            extension: "mvl",
            description: "Descent II Movielib",
            case_sensitive: false,
        }
    }

    fn sniff(&self, source: &mut ByteSource) -> bool {
        read_signature::<4>(source).is_some_and(|sig| sig == MVL_SIGNATURE)
    }

    fn parse(&self, source: &mut ByteSource) -> Result<EntryTable, ParseError> {
        source.seek_to(0)?;
        let header = MvlHeader::read(source)?;

        let directory = read_directory(source, HEADER_SIZE, header.entry_count, RECORD_SIZE)?;
        let mut records = Cursor::new(directory);

        let mut builder = EntryTableBuilder::new(source.len(), self.info().case_sensitive);
        let mut offset = HEADER_SIZE + u64::from(header.entry_count) * RECORD_SIZE;

        for _ in 0..header.entry_count {
            let record = MvlRecord::read(&mut records)?;
            let size = u64::from(record.size);
            builder.add_file(&record.name(), offset, size)?;
            offset += size;
        }

        Ok(builder.finish())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::mvl_archive;

    #[test]
    fn test_parse() {
        let data = mvl_archive(&[("intro-l.mve", b"movie"), ("end-l.mve", b"credits")]);
        let mut source = ByteSource::from_bytes(data);
        assert!(Mvl.sniff(&mut source));
        let table = Mvl.parse(&mut source).expect("parse");

        let intro = table.entry("INTRO-L.MVE").expect("intro");
        assert_eq!(intro.offset, 8 + 2 * 17);
        let mut end = table.open_range(&source, "end-l.mve").expect("open");
        assert_eq!(end.read_to_vec().expect("read"), b"credits");
    }

    #[test]
    fn test_thirteenth_byte_terminates_name() {
        let record = MvlRecord {
            name: *b"ABCDEFGHIJKLM",
            size: 0,
        };
        assert_eq!(record.name(), "ABCDEFGHIJKL");
    }

    #[test]
    fn test_empty_name_rejected() {
        let data = mvl_archive(&[("", b"x")]);
        let mut source = ByteSource::from_bytes(data);
        assert!(matches!(
            Mvl.parse(&mut source),
            Err(ParseError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let data = mvl_archive(&[("a.mve", b"1"), ("A.MVE", b"2")]);
        let mut source = ByteSource::from_bytes(data);
        assert!(matches!(
            Mvl.parse(&mut source),
            Err(ParseError::DuplicateEntry(_))
        ));
    }
}
