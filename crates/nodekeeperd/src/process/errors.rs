//! Error surface for the supervisor's own lifecycle.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::supervisor::SupervisorError;

use super::shutdown::ShutdownError;

/// Errors surfaced while running the supervisor process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping failed.
    #[error("bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[from]
        source: BootstrapError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[from]
        source: ShutdownError,
    },
    /// The node could not be stopped cleanly.
    #[error("failed to stop the node: {source}")]
    Stop {
        /// Underlying supervisor error.
        #[source]
        source: SupervisorError,
    },
}
