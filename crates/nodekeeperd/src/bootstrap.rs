//! Supervisor bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use nodekeeper_config::{Config, RuntimePaths, RuntimePathsError};

use crate::config_writer::{ConfigWriter, ConfigWriterError, OverlayEnvironment, Settings};
use crate::events::{EventBridge, EventHub};
use crate::health::HealthReporter;
use crate::query::QueryFacade;
use crate::rpc::{ControlClient, NotificationSource};
use crate::supervisor::{DaemonCommand, DaemonControl, ProcessSupervisor};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the supervisor configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        use ortho_config::OrthoConfig as _;

        Config::load()
    }
}

/// Loader that always yields the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The data directory could not be prepared.
    #[error("failed to prepare runtime paths: {source}")]
    Paths {
        /// Underlying filesystem error.
        #[source]
        source: RuntimePathsError,
    },
    /// The node configuration could not be brought up to date.
    #[error("failed to ensure node configuration: {source}")]
    NodeConfig {
        /// Underlying writer error.
        #[source]
        source: ConfigWriterError,
    },
}

/// Wired supervisor components produced by [`bootstrap_with`].
pub struct NodeKeeper {
    config: Config,
    settings: Settings,
    hub: Arc<EventHub>,
    supervisor: Arc<ProcessSupervisor>,
    config_writer: ConfigWriter,
    telemetry: TelemetryHandle,
}

impl NodeKeeper {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Settings in effect after the bootstrap configuration pass.
    #[must_use]
    pub const fn initial_settings(&self) -> &Settings {
        &self.settings
    }

    /// Process supervisor for the node.
    #[must_use]
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Configuration writer for the node's data directory.
    #[must_use]
    pub const fn config_writer(&self) -> &ConfigWriter {
        &self.config_writer
    }

    /// Event hub shared by the supervisor and any bridges.
    #[must_use]
    pub fn events(&self) -> Arc<EventHub> {
        Arc::clone(&self.hub)
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Builds an event bridge publishing into this supervisor's hub.
    #[must_use]
    pub fn event_bridge(
        &self,
        client: Arc<dyn ControlClient>,
        source: Arc<dyn NotificationSource>,
    ) -> EventBridge {
        EventBridge::new(client, source, self.events())
    }

    /// Builds a query facade over `client`.
    #[must_use]
    pub fn query_facade(&self, client: Arc<dyn ControlClient>) -> QueryFacade {
        QueryFacade::new(client)
    }
}

/// Bootstraps the supervisor using the supplied collaborators.
///
/// Loads configuration, installs telemetry, prepares the data directory,
/// wires the supervisor and configuration writer, and writes the node
/// configuration. The node itself is not started.
///
/// # Errors
///
/// Returns the first failing step as a [`BootstrapError`]; the reporter is
/// notified before returning.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<NodeKeeper, BootstrapError> {
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    let paths = RuntimePaths::from_config(&config)
        .map_err(|source| fail(BootstrapError::Paths { source }))?;

    let hub = Arc::new(EventHub::new());
    let supervisor = Arc::new(ProcessSupervisor::new(
        DaemonCommand::from_config(&config),
        Arc::clone(&hub),
        Arc::clone(&reporter),
    ));
    let config_writer = ConfigWriter::new(
        paths,
        OverlayEnvironment::from_config(&config),
        Arc::clone(&supervisor) as Arc<dyn DaemonControl>,
        Arc::clone(&reporter),
    );
    let settings = config_writer
        .ensure_config()
        .map_err(|source| fail(BootstrapError::NodeConfig { source }))?;

    reporter.bootstrap_succeeded(&config);
    Ok(NodeKeeper {
        config,
        settings,
        hub,
        supervisor,
        config_writer,
        telemetry,
    })
}
