//! Shared configuration for the nodekeeper supervisor.
//!
//! [`Config`] holds everything the supervisor needs from its environment:
//! where the node binary and data directory live, which chain to run,
//! control-interface credentials, push-notification endpoints, and the
//! addresses of the anonymising proxies the node is allowed to use. Values
//! are layered by `ortho_config` from defaults, a configuration file,
//! `NODEKEEPER_*` environment variables, and command-line flags, in that
//! order of increasing precedence.

mod chain;
mod defaults;
mod logging;
mod runtime;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use chain::{Chain, ChainParseError};
pub use defaults::{
    DEFAULT_I2P_SAM_PORT, DEFAULT_LOG_FILTER, DEFAULT_RPC_PORT, DEFAULT_TOR_CONTROL_PORT,
    DEFAULT_TOR_SOCKS_PORT, default_data_dir, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{
    OVERLAY_FILE_NAME, RuntimePaths, RuntimePathsError, SETTINGS_FILE_NAME, USER_FILE_NAME,
    backup_path,
};

/// Environment-sourced configuration for the supervisor and the node it runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "NODEKEEPER")]
pub struct Config {
    /// Path or name of the node binary.
    #[ortho_config(default = defaults::default_bitcoind_binary())]
    pub bitcoind_binary: Utf8PathBuf,
    /// Node data directory; configuration files are written here.
    #[ortho_config(default = defaults::default_data_dir())]
    pub data_dir: Utf8PathBuf,
    /// Chain the node runs on.
    #[ortho_config(default = Chain::Main)]
    pub chain: Chain,
    /// Control-interface user name.
    #[ortho_config(default = defaults::default_rpc_user())]
    pub rpc_user: String,
    /// Control-interface password.
    #[ortho_config(default = defaults::default_rpc_password())]
    pub rpc_password: String,
    /// Control-interface port.
    #[ortho_config(default = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,
    /// Push endpoint announcing new block hashes.
    #[ortho_config(default = defaults::default_zmq_block_endpoint())]
    pub zmq_block_endpoint: String,
    /// Push endpoint announcing new transaction hashes.
    #[ortho_config(default = defaults::default_zmq_tx_endpoint())]
    pub zmq_tx_endpoint: String,
    /// Host running the Tor SOCKS proxy and control port.
    #[ortho_config(default = defaults::default_loopback_host())]
    pub tor_host: String,
    /// Tor SOCKS proxy port.
    #[ortho_config(default = DEFAULT_TOR_SOCKS_PORT)]
    pub tor_socks_port: u16,
    /// Tor control port.
    #[ortho_config(default = DEFAULT_TOR_CONTROL_PORT)]
    pub tor_control_port: u16,
    /// Password for the Tor control port.
    #[ortho_config(default = String::new())]
    pub tor_control_password: String,
    /// Host running the I2P SAM bridge.
    #[ortho_config(default = defaults::default_loopback_host())]
    pub i2p_sam_host: String,
    /// I2P SAM bridge port.
    #[ortho_config(default = DEFAULT_I2P_SAM_PORT)]
    pub i2p_sam_port: u16,
    /// Peer allow-list in CIDR notation.
    #[ortho_config(default = defaults::default_peer_allowlist())]
    pub peer_allowlist: String,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[ortho_config(default = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bitcoind_binary: defaults::default_bitcoind_binary(),
            data_dir: default_data_dir(),
            chain: Chain::default(),
            rpc_user: defaults::default_rpc_user(),
            rpc_password: defaults::default_rpc_password(),
            rpc_port: DEFAULT_RPC_PORT,
            zmq_block_endpoint: defaults::default_zmq_block_endpoint(),
            zmq_tx_endpoint: defaults::default_zmq_tx_endpoint(),
            tor_host: defaults::default_loopback_host(),
            tor_socks_port: DEFAULT_TOR_SOCKS_PORT,
            tor_control_port: DEFAULT_TOR_CONTROL_PORT,
            tor_control_password: String::new(),
            i2p_sam_host: defaults::default_loopback_host(),
            i2p_sam_port: DEFAULT_I2P_SAM_PORT,
            peer_allowlist: defaults::default_peer_allowlist(),
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Tracing output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// `host:port` of the Tor SOCKS proxy.
    #[must_use]
    pub fn tor_proxy_address(&self) -> String {
        format!("{}:{}", self.tor_host, self.tor_socks_port)
    }

    /// `host:port` of the Tor control port.
    #[must_use]
    pub fn tor_control_address(&self) -> String {
        format!("{}:{}", self.tor_host, self.tor_control_port)
    }

    /// `host:port` of the I2P SAM bridge.
    #[must_use]
    pub fn i2p_sam_address(&self) -> String {
        format!("{}:{}", self.i2p_sam_host, self.i2p_sam_port)
    }
}
