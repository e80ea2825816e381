//! Default search path layout for a game

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::platform::PlatformDirs;
use crate::search_path::{MountPosition, MountSource, SearchPath};

impl SearchPath {
    /// Set up the usual layout for an application.
    ///
    /// - the pref directory becomes the write target and is searched first
    /// - the base directory is searched after it
    /// - files in the base directory with the configured archive extension
    ///   are mounted at the root, in name order, ahead of both directories
    ///   if `archives_first` is set and behind them otherwise
    ///
    /// Files that are not valid archives are skipped with a warning.
    pub fn apply_config(&self, config: &VfsConfig, dirs: &dyn PlatformDirs) -> VfsResult<()> {
        self.permit_symlinks(config.permit_symlinks);

        let pref = dirs.pref_dir(&config.organization, &config.app_name)?;
        let base = dirs.base_dir()?;

        self.set_write_target(Some(pref.as_path()))?;
        self.mount(MountSource::path(&pref), "", MountPosition::Prepend)?;
        self.mount(MountSource::path(&base), "", MountPosition::Append)?;

        let mut archives: Vec<PathBuf> = fs::read_dir(&base)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| config.is_archive_name(name))
            })
            .map(|entry| entry.path())
            .collect();
        archives.sort();

        let position = if config.archives_first {
            // Prepending in reverse keeps name order.
            archives.reverse();
            MountPosition::Prepend
        } else {
            MountPosition::Append
        };

        for archive in archives {
            match self.mount(MountSource::path(&archive), "", position) {
                Ok(()) => {}
                Err(
                    e @ (VfsError::UnrecognizedFormat
                    | VfsError::CorruptArchive { .. }
                    | VfsError::DuplicateEntry { .. }
                    | VfsError::OutOfRange { .. }),
                ) => {
                    warn!(archive = %archive.display(), error = %e, "skipping archive");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            organization = %config.organization,
            app = %config.app_name,
            mounts = self.mounts().len(),
            "applied configuration"
        );
        Ok(())
    }
}
