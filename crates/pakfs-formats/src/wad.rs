//! WAD archives (id Tech 1: Doom, Heretic, Hexen)
//!
//! Layout (all integers little-endian):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 4    | Signature `IWAD` or `PWAD` |
//! | 0x04   | 4    | Lump count |
//! | 0x08   | 4    | Directory offset |
//!
//! The directory holds 16-byte records: data offset, size, 8-byte
//! NUL-padded lump name.

use binrw::BinRead;
use std::io::Cursor;

use crate::error::ParseError;
use crate::format::{ArchiveFormat, FormatInfo, read_signature};
use crate::source::ByteSource;
use crate::table::{EntryTable, EntryTableBuilder};
use crate::utils::{decode_name, read_directory};

/// Signature of a main game WAD.
pub const IWAD_SIGNATURE: [u8; 4] = *b"IWAD";

/// Signature of a patch WAD.
pub const PWAD_SIGNATURE: [u8; 4] = *b"PWAD";

/// Directory record size in bytes.
pub const RECORD_SIZE: u64 = 16;

/// WAD header.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct WadHeader {
    /// `IWAD` or `PWAD`
    pub signature: [u8; 4],
    /// Number of lumps
    pub lump_count: u32,
    /// Absolute offset of the directory
    pub directory_offset: u32,
}

impl WadHeader {
    /// Whether this is a patch WAD.
    pub fn is_patch(&self) -> bool {
        self.signature == PWAD_SIGNATURE
    }
}

/// WAD directory record.
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct WadRecord {
    /// Absolute data offset
    pub offset: u32,
    /// Data size in bytes
    pub size: u32,
    /// NUL-padded lump name
    pub name: [u8; 8],
}

impl WadRecord {
    /// Lump name without padding.
    pub fn name(&self) -> String {
        decode_name(&self.name)
    }
}

fn is_wad_signature(sig: [u8; 4]) -> bool {
    sig == IWAD_SIGNATURE || sig == PWAD_SIGNATURE
}

/// WAD format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Wad;

impl ArchiveFormat for Wad {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "WAD",
            extension: "wad",
            description: "id Software WAD",
            case_sensitive: false,
        }
    }

    fn sniff(&self, source: &mut ByteSource) -> bool {
        read_signature::<4>(source).is_some_and(is_wad_signature)
    }

    fn parse(&self, source: &mut ByteSource) -> Result<EntryTable, ParseError> {
        source.seek_to(0)?;
        let header = WadHeader::read(source)?;
        if !is_wad_signature(header.signature) {
            return Err(ParseError::InvalidHeader(format!(
                "signature {:?}",
                decode_name(&header.signature)
            )));
        }

        let directory = read_directory(
            source,
            u64::from(header.directory_offset),
            header.lump_count,
            RECORD_SIZE,
        )?;
        let mut records = Cursor::new(directory);
        let mut builder = EntryTableBuilder::new(source.len(), self.info().case_sensitive);

        for _ in 0..header.lump_count {
            let record = WadRecord::read(&mut records)?;
            builder.add_file(&record.name(), u64::from(record.offset), u64::from(record.size))?;
        }

        Ok(builder.finish())
    }
}
