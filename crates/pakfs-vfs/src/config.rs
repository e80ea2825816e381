//! Search path configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{VfsError, VfsResult};

/// Settings for [`SearchPath::apply_config`](crate::SearchPath::apply_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Organization name, first level of the pref directory
    pub organization: String,

    /// Application name, second level of the pref directory
    pub app_name: String,

    /// Extension (without the dot) of archives to mount from the base
    /// directory; none mounts no archives
    pub archive_extension: Option<String>,

    /// Search archives before the pref and base directories
    pub archives_first: bool,

    /// Follow symlinks inside mounted directories
    pub permit_symlinks: bool,
}

impl VfsConfig {
    /// Configuration for `app_name` by `organization`.
    pub fn new(organization: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Mount base directory archives with this extension
    #[must_use]
    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.archive_extension = Some(extension.trim_start_matches('.').to_string());
        self
    }

    /// Search archives first
    #[must_use]
    pub const fn with_archives_first(mut self, first: bool) -> Self {
        self.archives_first = first;
        self
    }

    /// Follow symlinks in mounted directories
    #[must_use]
    pub const fn with_symlinks(mut self, permit: bool) -> Self {
        self.permit_symlinks = permit;
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| VfsError::config(format!("{}: {e}", path.display())))
    }

    /// Whether `file_name` carries the configured archive extension.
    pub fn is_archive_name(&self, file_name: &str) -> bool {
        let Some(extension) = self.archive_extension.as_deref() else {
            return false;
        };
        file_name
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension))
    }
}
