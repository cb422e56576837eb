//! Derives the on-disk artefact paths shared by the supervisor components.
//!
//! Everything the supervisor writes lives in the node data directory: the
//! machine-managed overlay, the user-facing configuration file that includes
//! it, and the persisted settings. Each artefact keeps a single sibling backup
//! with a `.bak` suffix.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// File name of the machine-managed overlay configuration.
pub const OVERLAY_FILE_NAME: &str = "nodekeeper.conf";

/// File name of the user-facing configuration file read by the node.
pub const USER_FILE_NAME: &str = "bitcoin.conf";

/// File name of the persisted settings document.
pub const SETTINGS_FILE_NAME: &str = "nodekeeper-settings.json";

/// Canonical paths for the supervisor's configuration artefacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    data_dir: PathBuf,
    overlay_path: PathBuf,
    user_config_path: PathBuf,
    settings_path: PathBuf,
}

impl RuntimePaths {
    /// Derives paths from the configuration, creating the data directory.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let paths = Self::in_dir(config.data_dir.as_std_path());
        fs::create_dir_all(&paths.data_dir).map_err(|source| {
            RuntimePathsError::DataDirectory {
                path: paths.data_dir.clone(),
                source,
            }
        })?;
        Ok(paths)
    }

    /// Derives paths rooted at `data_dir` without touching the filesystem.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            overlay_path: data_dir.join(OVERLAY_FILE_NAME),
            user_config_path: data_dir.join(USER_FILE_NAME),
            settings_path: data_dir.join(SETTINGS_FILE_NAME),
            data_dir,
        }
    }

    /// Node data directory.
    pub fn data_dir(&self) -> &Path {
        self.data_dir.as_path()
    }

    /// Machine-managed overlay file.
    pub fn overlay_path(&self) -> &Path {
        self.overlay_path.as_path()
    }

    /// User-facing configuration file.
    pub fn user_config_path(&self) -> &Path {
        self.user_config_path.as_path()
    }

    /// Persisted settings document.
    pub fn settings_path(&self) -> &Path {
        self.settings_path.as_path()
    }
}

/// Returns the sibling backup path for `path` (`<name>.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Errors raised while preparing runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// Creating the data directory failed.
    #[error("failed to prepare data directory '{path}': {source}")]
    DataDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
