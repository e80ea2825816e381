//! Read-only game archive formats
//!
//! This crate indexes the classic single-file game archives and exposes
//! their contents through one entry table type, whatever the container.
//!
//! # Supported Formats
//!
//! - **GRP**: Build engine group files (`KenSilverman`)
//! - **MVL**: Descent II movie libraries (`DMVL`)
//! - **WAD**: id Tech 1 lump files (`IWAD`/`PWAD`)
//! - **SLB**: Independence War archives (no signature)
//!
//! # Example
//!
//! ```no_run
//! use pakfs_formats::{ByteSource, FormatRegistry};
//!
//! let registry = FormatRegistry::default();
//! let archive = registry.open(ByteSource::open("DUKE3D.GRP")?)?;
//! for name in archive.enumerate("").into_iter().flatten() {
//!     println!("{name}");
//! }
//! let mut con = archive.open("GAME.CON")?;
//! let text = con.read_to_vec()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod grp;
pub mod mvl;
pub mod registry;
pub mod slb;
pub mod source;
pub mod table;
pub mod utils;
pub mod wad;

#[cfg(test)]
mod test_utils;

pub use error::{FormatError, ParseError, Result, SourceError};
pub use format::{ArchiveFormat, FormatInfo};
pub use grp::Grp;
pub use mvl::Mvl;
pub use registry::{Archive, FormatRegistry};
pub use slb::Slb;
pub use source::{ByteSource, FileBacking, MappedFile, MemoryBacking, ReadAt};
pub use table::{Entry, EntryKind, EntryStat, EntryTable, EntryTableBuilder};
pub use wad::Wad;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
