//! Errors surfaced by the process supervisor.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Failures reported by [`ProcessSupervisor`](super::ProcessSupervisor).
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The node binary could not be spawned.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A helper thread for output capture or exit tracking could not start.
    #[error("failed to start {purpose} thread: {source}")]
    Thread {
        /// What the thread was for.
        purpose: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Delivering the termination signal failed.
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        /// Target process.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}
