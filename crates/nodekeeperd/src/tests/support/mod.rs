//! Shared doubles and fixtures for the supervisor test suites.

mod config_loader;
mod node;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader, node_script};
pub use node::{
    ScriptedControlClient, ScriptedNotificationSource, block_hash_for, block_header,
    block_notification, blockchain_info, mempool_info, tx_notification,
};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{CRASHING_NODE, IDLE_NODE, TestWorld, world};
