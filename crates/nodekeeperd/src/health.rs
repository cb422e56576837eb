//! Structured health reporting for supervisor lifecycle events.

use std::path::Path;
use std::sync::Arc;

use nodekeeper_config::Config;
use nodekeeper_events::ExitInfo;

use crate::bootstrap::BootstrapError;
use crate::supervisor::SupervisorError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a configuration artefact has been durably written.
    fn config_written(&self, path: &Path);

    /// Invoked after the node process has been spawned.
    fn daemon_started(&self, pid: u32);

    /// Invoked when the node process could not be spawned.
    fn daemon_start_failed(&self, error: &SupervisorError);

    /// Invoked when the node exits after a requested stop.
    fn daemon_stopped(&self, pid: u32);

    /// Invoked when the node exits without a stop having been requested.
    fn daemon_crashed(&self, pid: u32, exit: &ExitInfo);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn config_written(&self, path: &Path) {
        (**self).config_written(path);
    }

    fn daemon_started(&self, pid: u32) {
        (**self).daemon_started(pid);
    }

    fn daemon_start_failed(&self, error: &SupervisorError) {
        (**self).daemon_start_failed(error);
    }

    fn daemon_stopped(&self, pid: u32) {
        (**self).daemon_stopped(pid);
    }

    fn daemon_crashed(&self, pid: u32, exit: &ExitInfo) {
        (**self).daemon_crashed(pid, exit);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting supervisor bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            chain = %config.chain,
            data_dir = %config.data_dir,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "supervisor bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "supervisor bootstrap failed"
        );
    }

    fn config_written(&self, path: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "config_written",
            path = %path.display(),
            "configuration written"
        );
    }

    fn daemon_started(&self, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "daemon_started",
            pid,
            "bitcoind started"
        );
    }

    fn daemon_start_failed(&self, error: &SupervisorError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "daemon_start_failed",
            error = %error,
            "bitcoind failed to start"
        );
    }

    fn daemon_stopped(&self, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "daemon_stopped",
            pid,
            "bitcoind stopped"
        );
    }

    fn daemon_crashed(&self, pid: u32, exit: &ExitInfo) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "daemon_crashed",
            pid,
            code = ?exit.code,
            signal = ?exit.signal,
            message = %exit.message,
            captured_lines = exit.logs.len(),
            "bitcoind exited unexpectedly"
        );
    }
}
