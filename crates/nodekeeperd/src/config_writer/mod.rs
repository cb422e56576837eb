//! Translation of user settings into the node's configuration files.
//!
//! Three artefacts live in the data directory:
//!
//! * the settings document (`nodekeeper-settings.json`), the source of truth
//!   for every user-adjustable option;
//! * the overlay (`nodekeeper.conf`), fully regenerated from the settings on
//!   every write;
//! * the user file (`bitcoin.conf`), owned by the operator, which only has
//!   to start with a banner including the overlay.
//!
//! Every write goes through [`durable::durable_write`], so each artefact is
//! either fully old or fully new and keeps a `.bak` of its previous version.

mod durable;
mod errors;
mod render;
mod rules;
mod settings;
mod user_file;


use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nodekeeper_config::RuntimePaths;
use serde_json::Value;
use tracing::{debug, info, warn};

pub use errors::{ConfigWriterError, WriteStage};
pub use render::{OverlayEnvironment, render_overlay};
pub use rules::apply_rules;
pub use settings::{Network, NetworkSet, Settings, SettingsError};

use crate::health::HealthReporter;
use crate::supervisor::DaemonControl;

use self::durable::durable_write;

const CONFIG_WRITER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::config_writer");

/// Owns the settings document and keeps the node's configuration in step
/// with it.
///
/// Updates are serialised. Each update validates before touching the disk,
/// writes all artefacts, and only then asks the node to restart.
pub struct ConfigWriter {
    paths: RuntimePaths,
    environment: OverlayEnvironment,
    daemon: Arc<dyn DaemonControl>,
    reporter: Arc<dyn HealthReporter>,
    settings: Mutex<Option<Settings>>,
}

impl ConfigWriter {
    /// Builds a writer for the artefacts under `paths`.
    #[must_use]
    pub fn new(
        paths: RuntimePaths,
        environment: OverlayEnvironment,
        daemon: Arc<dyn DaemonControl>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            paths,
            environment,
            daemon,
            reporter,
            settings: Mutex::new(None),
        }
    }

    /// Brings the overlay and user file in line with the stored settings.
    ///
    /// Missing or unreadable settings fall back to defaults. Running this
    /// repeatedly without intervening changes produces byte-identical files.
    ///
    /// # Errors
    ///
    /// Returns an error when an artefact cannot be read or written.
    pub fn ensure_config(&self) -> Result<Settings, ConfigWriterError> {
        let mut cached = self.lock_settings();
        let settings = self.load_settings()?;
        self.write_overlay(&settings)?;
        self.ensure_banner()?;
        info!(target: CONFIG_WRITER_TARGET, "configuration ensured");
        *cached = Some(settings.clone());
        Ok(settings)
    }

    /// Effective settings, loaded from disk on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings document exists but cannot be read.
    pub fn settings(&self) -> Result<Settings, ConfigWriterError> {
        let mut cached = self.lock_settings();
        if let Some(settings) = cached.as_ref() {
            return Ok(settings.clone());
        }
        let settings = self.load_settings()?;
        *cached = Some(settings.clone());
        Ok(settings)
    }

    /// Applies a partial update, rewrites every artefact, and restarts the
    /// node.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigWriterError::Settings`] without writing anything when
    /// the patch is rejected. Write failures stop the update before the
    /// restart. [`ConfigWriterError::Restart`] means the files were written
    /// but the node did not come back.
    pub fn update_settings(&self, patch: &Value) -> Result<Settings, ConfigWriterError> {
        let settings = {
            let mut cached = self.lock_settings();
            let current = match cached.as_ref() {
                Some(settings) => settings.clone(),
                None => self.load_settings()?,
            };
            let settings = apply_rules(current.merge_patch(patch)?);
            self.write_overlay(&settings)?;
            self.ensure_banner()?;
            // The stored document only changes once the node files agree with it.
            self.write_settings(&settings)?;
            *cached = Some(settings.clone());
            settings
        };
        info!(target: CONFIG_WRITER_TARGET, "settings updated; restarting bitcoind");
        self.restart()?;
        Ok(settings)
    }

    /// Operator-supplied options that follow the banner in the user file.
    ///
    /// # Errors
    ///
    /// Returns an error when the user file exists but cannot be read.
    pub fn custom_options(&self) -> Result<String, ConfigWriterError> {
        let content = read_optional(self.paths.user_config_path())?.unwrap_or_default();
        Ok(user_file::custom_options(&content))
    }

    /// Replaces the custom options and restarts the node.
    ///
    /// # Errors
    ///
    /// Returns an error when the user file cannot be written or the node
    /// cannot be restarted.
    pub fn update_custom_options(&self, text: &str) -> Result<(), ConfigWriterError> {
        {
            let _serialised = self.lock_settings();
            self.write_artefact(self.paths.user_config_path(), user_file::compose(text).as_bytes())?;
        }
        info!(target: CONFIG_WRITER_TARGET, "custom options updated; restarting bitcoind");
        self.restart()
    }

    /// Renders the overlay for `settings` after applying the derivation rules.
    #[must_use]
    pub fn render(&self, settings: &Settings) -> String {
        render_overlay(&apply_rules(settings.clone()), &self.environment)
    }

    /// Artefact locations.
    #[must_use]
    pub const fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    fn load_settings(&self) -> Result<Settings, ConfigWriterError> {
        let path = self.paths.settings_path();
        let Some(content) = read_optional(path)? else {
            debug!(target: CONFIG_WRITER_TARGET, "no stored settings; using defaults");
            return Ok(apply_rules(Settings::default()));
        };
        let parsed = serde_json::from_str::<Settings>(&content)
            .map_err(|error| error.to_string())
            .and_then(|settings| {
                settings
                    .validate()
                    .map(|()| settings)
                    .map_err(|error| error.to_string())
            });
        match parsed {
            Ok(settings) => Ok(apply_rules(settings)),
            Err(error) => {
                warn!(
                    target: CONFIG_WRITER_TARGET,
                    path = %path.display(),
                    %error,
                    "ignoring unusable settings document; using defaults"
                );
                Ok(apply_rules(Settings::default()))
            }
        }
    }

    fn write_settings(&self, settings: &Settings) -> Result<(), ConfigWriterError> {
        let mut document = serde_json::to_string_pretty(settings)
            .map_err(|source| ConfigWriterError::Serialise { source })?;
        document.push('\n');
        self.write_artefact(self.paths.settings_path(), document.as_bytes())
    }

    fn write_overlay(&self, settings: &Settings) -> Result<(), ConfigWriterError> {
        let overlay = render_overlay(settings, &self.environment);
        self.write_artefact(self.paths.overlay_path(), overlay.as_bytes())
    }

    fn ensure_banner(&self) -> Result<(), ConfigWriterError> {
        let path = self.paths.user_config_path();
        let existing = read_optional(path)?.unwrap_or_default();
        match user_file::with_banner(&existing) {
            Some(updated) => self.write_artefact(path, updated.as_bytes()),
            None => Ok(()),
        }
    }

    fn write_artefact(&self, path: &Path, contents: &[u8]) -> Result<(), ConfigWriterError> {
        durable_write(path, contents)?;
        self.reporter.config_written(path);
        Ok(())
    }

    fn restart(&self) -> Result<(), ConfigWriterError> {
        self.daemon
            .restart()
            .map_err(|source| ConfigWriterError::Restart { source })
    }

    fn lock_settings(&self) -> MutexGuard<'_, Option<Settings>> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigWriterError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigWriterError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
