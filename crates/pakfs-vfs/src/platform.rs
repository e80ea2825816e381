//! Platform directory lookup

use std::fs;
use std::path::PathBuf;

use crate::error::{VfsError, VfsResult};

/// Where an application lives and where it may keep user data.
pub trait PlatformDirs: Send + Sync {
    /// Directory holding the running program.
    fn base_dir(&self) -> VfsResult<PathBuf>;

    /// Per-user writable data directory for `app` by `organization`,
    /// created if missing.
    fn pref_dir(&self, organization: &str, app: &str) -> VfsResult<PathBuf>;
}

/// Reject names that would nest or escape the pref directory.
pub(crate) fn check_dir_name(kind: &str, name: &str) -> VfsResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':', '\0'])
    {
        return Err(VfsError::config(format!("invalid {kind} name {name:?}")));
    }
    Ok(())
}

/// Directories reported by the operating system.
///
/// The base directory is that of the current executable; the pref
/// directory is `<data dir>/<organization>/<app>`, where the data directory
/// is e.g. `~/.local/share` on Linux or `%APPDATA%` on Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDirs;

impl PlatformDirs for SystemDirs {
    fn base_dir(&self) -> VfsResult<PathBuf> {
        let exe = std::env::current_exe()?;
        exe.parent()
            .map(PathBuf::from)
            .ok_or_else(|| VfsError::config("executable has no parent directory"))
    }

    fn pref_dir(&self, organization: &str, app: &str) -> VfsResult<PathBuf> {
        check_dir_name("organization", organization)?;
        check_dir_name("application", app)?;
        let dir = dirs::data_dir()
            .ok_or_else(|| VfsError::config("no user data directory"))?
            .join(organization)
            .join(app);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
