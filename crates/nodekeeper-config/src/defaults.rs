use std::env;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default control-interface port (mainnet convention).
pub const DEFAULT_RPC_PORT: u16 = 8332;

/// Default Tor SOCKS proxy port.
pub const DEFAULT_TOR_SOCKS_PORT: u16 = 9050;

/// Default Tor control port.
pub const DEFAULT_TOR_CONTROL_PORT: u16 = 9051;

/// Default I2P SAM bridge port.
pub const DEFAULT_I2P_SAM_PORT: u16 = 7656;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

const LOOPBACK_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Computes the default node data directory.
///
/// Uses the platform's local data directory when one is known and falls back
/// to the temporary directory otherwise.
pub fn default_data_dir() -> Utf8PathBuf {
    let mut base = dirs::data_local_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.push("nodekeeper");
    base.push("bitcoin");
    base
}

fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

pub(crate) fn default_bitcoind_binary() -> Utf8PathBuf {
    Utf8PathBuf::from("bitcoind")
}

pub(crate) fn default_rpc_user() -> String {
    "nodekeeper".to_owned()
}

pub(crate) fn default_rpc_password() -> String {
    "nodekeeper".to_owned()
}

pub(crate) fn default_zmq_block_endpoint() -> String {
    format!("tcp://{LOOPBACK_HOST}:28332")
}

pub(crate) fn default_zmq_tx_endpoint() -> String {
    format!("tcp://{LOOPBACK_HOST}:28333")
}

pub(crate) fn default_loopback_host() -> String {
    LOOPBACK_HOST.to_owned()
}

pub(crate) fn default_peer_allowlist() -> String {
    format!("{LOOPBACK_HOST}/32")
}
