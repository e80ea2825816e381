//! Layered virtual filesystem over game archives and directories
//!
//! A [`SearchPath`] merges native directories and read-only archives (see
//! [`pakfs_formats`]) into one tree. Reads resolve to the first mount that
//! holds a path; writes all go to a single native write target.
//!
//! ```no_run
//! use pakfs_vfs::{MountPosition, MountSource, SearchPath, SystemDirs, VfsConfig};
//! use std::io::Write;
//!
//! let vfs = SearchPath::default();
//! let config = VfsConfig::new("3DRealms", "Duke3D").with_archive_extension("grp");
//! vfs.apply_config(&config, &SystemDirs)?;
//! vfs.mount(MountSource::path("addons/vacation.grp"), "/", MountPosition::Prepend)?;
//!
//! let con = vfs.open_read("GAME.CON")?.read_to_vec()?;
//! let mut save = vfs.open_write("game0.sav")?;
//! save.write_all(&con)?;
//! save.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod bootstrap;
pub mod config;
pub mod error;
pub mod path;
pub mod platform;
pub mod search_path;
pub mod store;
pub mod write;

pub use config::VfsConfig;
pub use error::{VfsError, VfsResult};
pub use platform::{PlatformDirs, SystemDirs};
pub use search_path::{Metadata, MountInfo, MountPosition, MountSource, SearchPath};
pub use store::{ArchiveStore, DirectoryStore, Store, StoreKind};
pub use write::WriteStream;

pub use pakfs_formats::{ByteSource, EntryKind, FormatRegistry};
