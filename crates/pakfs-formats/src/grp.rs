//! GRP archives (Build engine: Duke Nukem 3D, Shadow Warrior, Blood)
//!
//! Layout (all integers little-endian):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 12   | Signature `KenSilverman` |
//! | 0x0C   | 4    | Entry count |
//! | 0x10   | 16 * count | Records: 12-byte space-padded name, 4-byte size |
//! | ...    | ...  | File data, back-to-back in record order |

use binrw::BinRead;
use std::io::Cursor;

use crate::error::ParseError;
use crate::format::{ArchiveFormat, FormatInfo, read_signature};
use crate::source::ByteSource;
use crate::table::{EntryTable, EntryTableBuilder};
use crate::utils::{decode_name, read_directory};

/// GRP signature.
pub const GRP_SIGNATURE: [u8; 12] = *b"KenSilverman";

/// Header size in bytes.
pub const HEADER_SIZE: u64 = 16;

/// Directory record size in bytes.
pub const RECORD_SIZE: u64 = 16;

/// GRP header.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little, magic = b"KenSilverman")]
pub struct GrpHeader {
    /// Number of directory records
    pub entry_count: u32,
}

/// GRP directory record.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct GrpRecord {
    /// Space-padded name, not NUL-terminated
    pub name: [u8; 12],
    /// Data size in bytes
    pub size: u32,
}

impl GrpRecord {
    /// Stored name without padding.
    pub fn name(&self) -> String {
        decode_name(&self.name).trim_end_matches(' ').to_string()
    }
}

/// GRP format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Grp;

impl ArchiveFormat for Grp {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "GRP",
            extension: "grp",
            description: "Build engine GRP",
            case_sensitive: false,
        }
    }

    fn sniff(&self, source: &mut ByteSource) -> bool {
        read_signature::<12>(source).is_some_and(|sig| sig == GRP_SIGNATURE)
    }

    fn parse(&self, source: &mut ByteSource) -> Result<EntryTable, ParseError> {
        source.seek_to(0)?;
        let header = GrpHeader::read(source)?;

        let directory = read_directory(source, HEADER_SIZE, header.entry_count, RECORD_SIZE)?;
        let mut records = Cursor::new(directory);

        let mut builder = EntryTableBuilder::new(source.len(), self.info().case_sensitive);
        let mut offset = HEADER_SIZE + u64::from(header.entry_count) * RECORD_SIZE;

        for _ in 0..header.entry_count {
            let record = GrpRecord::read(&mut records)?;
            let size = u64::from(record.size);
            builder.add_file(&record.name(), offset, size)?;
            offset += size;
        }

        Ok(builder.finish())
    }
}
