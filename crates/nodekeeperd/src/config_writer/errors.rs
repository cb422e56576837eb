//! Errors surfaced by the configuration writer.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::settings::SettingsError;
use crate::supervisor::SupervisorError;

/// Step of a durable write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Copying the existing file to its backup.
    Backup,
    /// Writing and syncing the temporary file.
    Stage,
    /// Renaming the temporary file onto the destination.
    Rename,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Backup => "backup",
            Self::Stage => "staging",
            Self::Rename => "rename",
        })
    }
}

/// Failures reported by [`ConfigWriter`](super::ConfigWriter).
#[derive(Debug, Error)]
pub enum ConfigWriterError {
    /// The requested settings were rejected; nothing was written.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Reading an existing artefact failed.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A durable write failed.
    #[error("failed to write '{path}' during {stage}: {source}")]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Step that failed.
        stage: WriteStage,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the settings document failed.
    #[error("failed to serialise settings: {source}")]
    Serialise {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// Files were written but the node could not be restarted.
    #[error("configuration written but restart failed: {source}")]
    Restart {
        /// Underlying supervisor error.
        #[source]
        source: SupervisorError,
    },
}
