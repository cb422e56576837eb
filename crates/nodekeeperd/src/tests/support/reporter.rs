//! Test double for [`HealthReporter`] that records lifecycle events.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use nodekeeper_config::Config;
use nodekeeper_events::ExitInfo;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::supervisor::SupervisorError;

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ConfigWritten(PathBuf),
    DaemonStarted(u32),
    DaemonStartFailed(String),
    DaemonStopped(u32),
    DaemonCrashed { pid: u32, message: String },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn config_written(&self, path: &Path) {
        self.record(HealthEvent::ConfigWritten(path.to_path_buf()));
    }

    fn daemon_started(&self, pid: u32) {
        self.record(HealthEvent::DaemonStarted(pid));
    }

    fn daemon_start_failed(&self, error: &SupervisorError) {
        self.record(HealthEvent::DaemonStartFailed(error.to_string()));
    }

    fn daemon_stopped(&self, pid: u32) {
        self.record(HealthEvent::DaemonStopped(pid));
    }

    fn daemon_crashed(&self, pid: u32, exit: &ExitInfo) {
        self.record(HealthEvent::DaemonCrashed {
            pid,
            message: exit.message.clone(),
        });
    }
}
