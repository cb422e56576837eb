//! Runs the supervisor until a termination signal arrives.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the supervisor using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, signal handling, or the final stop
/// fails. A node that fails to start is reported but does not end the run.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
}

/// Runs the supervisor with injected collaborators.
pub(crate) fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let keeper = bootstrap_with(loader, reporter)?;
    let supervisor = keeper.supervisor();
    info!(
        target: PROCESS_TARGET,
        chain = %keeper.config().chain,
        version = %supervisor.version().version,
        "starting node"
    );

    // A failed start stays visible through the node status.
    if let Err(error) = supervisor.start() {
        warn!(target: PROCESS_TARGET, %error, "node did not start");
    }

    let signal = shutdown.wait()?;
    info!(target: PROCESS_TARGET, signal = signal.as_str(), "shutdown requested");
    supervisor
        .stop()
        .map_err(|source| LaunchError::Stop { source })?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
