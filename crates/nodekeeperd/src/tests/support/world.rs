//! BDD world: owns the loader, reporter, and whatever bootstrap produced.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nodekeeper_events::{DomainEvent, ExitInfo};
use serde_json::Value;
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, ConfigLoader, NodeKeeper, bootstrap_with};
use crate::config_writer::{ConfigWriterError, Settings};
use crate::events::Subscription;

use super::config_loader::{FailingConfigLoader, TestConfigLoader, node_script};
use super::reporter::{HealthEvent, RecordingHealthReporter};

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Node stand-in that reports a version and then idles.
pub const IDLE_NODE: &str = "exec sleep 30";

/// Node stand-in that prints a few lines and exits with status 3.
pub const CRASHING_NODE: &str = "echo 'Bitcoin Core starting'; \
     echo 'Error: Corrupted block database detected' >&2; exit 3";

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    scripts: TempDir,
    pub reporter: Arc<RecordingHealthReporter>,
    keeper: Option<NodeKeeper>,
    bootstrap_error: Option<BootstrapError>,
    subscription: Option<Subscription>,
    update: Option<Result<Settings, ConfigWriterError>>,
}

impl TestWorld {
    /// Builds a world whose node binary does not exist.
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            scripts: TempDir::new().expect("failed to create script directory"),
            reporter: Arc::new(RecordingHealthReporter::default()),
            keeper: None,
            bootstrap_error: None,
            subscription: None,
            update: None,
        }
    }

    /// Uses a node binary running `body` after answering `--version`.
    pub fn use_node_script(&mut self, body: &str) {
        let binary = node_script(self.scripts.path(), body);
        self.loader = Box::new(TestConfigLoader::new().with_binary(binary));
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.keeper.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(keeper) => self.keeper = Some(keeper),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    pub fn keeper(&self) -> &NodeKeeper {
        self.keeper.as_ref().expect("bootstrap did not produce a supervisor")
    }

    pub fn attach_subscriber(&mut self) {
        self.subscription = Some(self.keeper().supervisor().subscribe());
    }

    /// Waits for the next exit event, skipping everything else.
    pub fn next_exit(&self) -> Option<ExitInfo> {
        let subscription = self.subscription.as_ref()?;
        while let Some(event) = subscription.next_timeout(EVENT_TIMEOUT) {
            if let DomainEvent::Exit(exit) = event {
                return Some(exit);
            }
        }
        None
    }

    /// Events queued for the subscriber so far.
    pub fn queued_events(&self) -> Vec<DomainEvent> {
        self.subscription
            .as_ref()
            .map(Subscription::drain)
            .unwrap_or_default()
    }

    pub fn update_settings(&mut self, patch: &Value) {
        self.update = Some(self.keeper().config_writer().update_settings(patch));
    }

    pub fn update_result(&self) -> Option<&Result<Settings, ConfigWriterError>> {
        self.update.as_ref()
    }

    pub fn overlay_path(&self) -> PathBuf {
        self.keeper()
            .config_writer()
            .paths()
            .overlay_path()
            .to_path_buf()
    }

    pub fn user_config_path(&self) -> PathBuf {
        self.keeper()
            .config_writer()
            .paths()
            .user_config_path()
            .to_path_buf()
    }

    /// Number of successful node spawns recorded by the reporter.
    pub fn starts(&self) -> usize {
        self.reporter
            .events()
            .iter()
            .filter(|event| matches!(event, HealthEvent::DaemonStarted(_)))
            .count()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
