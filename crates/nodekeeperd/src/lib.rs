//! Supervisor for a locally managed Bitcoin node.
//!
//! `nodekeeperd` owns the lifecycle of a `bitcoind` process and the
//! configuration it reads. Bootstrap loads [`nodekeeper_config::Config`],
//! initialises structured telemetry, prepares the data directory, and writes
//! the node configuration from the persisted settings. The node is then
//! started and kept under supervision until a termination signal arrives.
//!
//! The main parts are:
//!
//! - [`ProcessSupervisor`] spawns the node, captures its output into a
//!   bounded ring, and publishes an exit event when the node dies without
//!   being asked to. Crashed nodes stay down until someone restarts them.
//! - [`ConfigWriter`] turns typed [`Settings`] into the machine-managed
//!   overlay and keeps the operator's `bitcoin.conf` pointing at it. Every
//!   write is durable and leaves a single `.bak` copy behind; a settings
//!   update restarts the node only after all files are on disk.
//! - [`EventBridge`] converts the node's push notifications into domain
//!   events on the shared [`EventHub`]. Transaction activity is held back
//!   until the node has caught up and then coalesced into bursts.
//! - [`QueryFacade`] answers status queries through short-lived caches so
//!   that polling clients cannot overload the control interface.
//!
//! Transports for the control interface and the notification channel are
//! supplied by the embedding application through [`ControlClient`] and
//! [`NotificationSource`].

mod bootstrap;
pub mod config_writer;
pub mod events;
mod health;
mod process;
pub mod query;
pub mod rpc;
pub mod supervisor;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, NodeKeeper, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use config_writer::{ConfigWriter, ConfigWriterError, Settings};
pub use events::{BridgeError, EventBridge, EventHub, Subscription};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS,
    run_daemon,
};
pub use query::{QueryError, QueryFacade};
pub use rpc::{ControlClient, NotificationSource};
pub use supervisor::{DaemonControl, DaemonStatus, ProcessSupervisor, SupervisorError};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
