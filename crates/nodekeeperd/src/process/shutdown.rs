//! Termination signals that end a supervisor run.

use std::io;

use nix::sys::signal::Signal;
use signal_hook::iterator::Signals;
use thiserror::Error;

/// Signals that stop the supervisor and, with it, the node.
pub const TERMINATION_SIGNALS: [Signal; 4] = [
    Signal::SIGTERM,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGHUP,
];

/// Source of the request to shut the supervisor down.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed and returns the signal that
    /// requested it.
    fn wait(&self) -> Result<Signal, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering for the termination signals failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
    /// The signal iterator closed before any signal arrived.
    #[error("signal listener closed without delivering a signal")]
    Closed,
}

/// Listens for [`TERMINATION_SIGNALS`] through `signal-hook`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<Signal, ShutdownError> {
        let mut signals = Signals::new(TERMINATION_SIGNALS.map(|signal| signal as i32))
            .map_err(|source| ShutdownError::Install { source })?;
        signals
            .forever()
            .find_map(|raw| Signal::try_from(raw).ok())
            .ok_or(ShutdownError::Closed)
    }
}
