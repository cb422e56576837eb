//! User-adjustable node settings and their validation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Network a peer connection can run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Plain IPv4 and IPv6.
    Clearnet,
    /// Tor onion services.
    Tor,
    /// I2P garlic routing.
    I2p,
}

impl Network {
    /// Every supported network, in rendering order.
    pub const ALL: [Self; 3] = [Self::Clearnet, Self::Tor, Self::I2p];

    /// Values of the node's `onlynet` option selecting this network.
    #[must_use]
    pub const fn onlynet_names(self) -> &'static [&'static str] {
        match self {
            Self::Clearnet => &["ipv4", "ipv6"],
            Self::Tor => &["onion"],
            Self::I2p => &["i2p"],
        }
    }
}

/// Set of enabled networks.
pub type NetworkSet = BTreeSet<Network>;

fn all_networks() -> NetworkSet {
    Network::ALL.into_iter().collect()
}

/// Typed record of every user-adjustable node option.
///
/// Serialised with camelCase keys; missing keys take their defaults when a
/// stored document is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Networks used for outbound connections.
    pub outgoing_connections: NetworkSet,
    /// Networks accepting inbound connections.
    pub incoming_connections: NetworkSet,
    /// Route clearnet traffic through the Tor proxy.
    pub tor_proxy_for_clearnet: bool,
    /// Serve compact block filters to peers.
    pub peer_block_filters: bool,
    /// Maintain the compact block filter index.
    pub block_filter_index: bool,
    /// Serve bloom-filtered blocks to peers.
    pub peer_bloom_filters: bool,
    /// Seconds a misbehaving peer stays banned.
    pub bantime: u64,
    /// Maximum number of peer connections.
    pub max_connections: u64,
    /// Per-connection receive buffer, in KB.
    pub max_receive_buffer: u64,
    /// Per-connection send buffer, in KB.
    pub max_send_buffer: u64,
    /// Seconds before an unresponsive peer is dropped.
    pub peer_timeout: u64,
    /// Connection timeout, in milliseconds.
    pub timeout: u64,
    /// Daily upload target in MiB; 0 disables the limit.
    pub max_upload_target: u64,
    /// Database cache size in MiB.
    pub db_cache: u64,
    /// Pruning target in MiB; 0 keeps every block.
    pub prune: u64,
    /// Maintain the full transaction index.
    pub tx_index: bool,
    /// Accept replacements regardless of signalling.
    pub mempool_full_rbf: bool,
    /// Relay and mine data-carrier transactions.
    pub data_carrier: bool,
    /// Maximum data-carrier payload in bytes.
    pub data_carrier_size: u64,
    /// Relay bare multisig outputs.
    pub permit_bare_multisig: bool,
    /// Mempool memory limit in MB.
    pub max_mempool: u64,
    /// Hours before an unconfirmed transaction is evicted.
    pub mempool_expiry: u64,
    /// Save the mempool across restarts.
    pub persist_mempool: bool,
    /// Only relay blocks, not loose transactions.
    pub blocks_only: bool,
    /// Enable the public REST interface.
    pub rest: bool,
    /// Depth of the control-interface work queue.
    pub rpc_work_queue: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            outgoing_connections: all_networks(),
            incoming_connections: all_networks(),
            tor_proxy_for_clearnet: false,
            peer_block_filters: true,
            block_filter_index: true,
            peer_bloom_filters: false,
            bantime: 86_400,
            max_connections: 125,
            max_receive_buffer: 5_000,
            max_send_buffer: 1_000,
            peer_timeout: 60,
            timeout: 5_000,
            max_upload_target: 0,
            db_cache: 450,
            prune: 0,
            tx_index: true,
            mempool_full_rbf: true,
            data_carrier: true,
            data_carrier_size: 83,
            permit_bare_multisig: true,
            max_mempool: 300,
            mempool_expiry: 336,
            persist_mempool: true,
            blocks_only: false,
            rest: false,
            rpc_work_queue: 128,
        }
    }
}

impl Settings {
    /// Checks every value against the range the node accepts.
    ///
    /// Any non-zero `prune` target passes; bitcoind enforces its own floor.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let bounds: [(&'static str, u64, u64, u64, &'static str); 7] = [
            ("dbCache", self.db_cache, 4, 16_384, "between 4 and 16384"),
            ("maxConnections", self.max_connections, 0, 1_000, "at most 1000"),
            ("dataCarrierSize", self.data_carrier_size, 0, 100_000, "at most 100000"),
            ("rpcWorkQueue", self.rpc_work_queue, 1, u64::MAX, "at least 1"),
            ("peerTimeout", self.peer_timeout, 1, u64::MAX, "at least 1"),
            ("timeout", self.timeout, 1, u64::MAX, "at least 1"),
            ("maxMempool", self.max_mempool, 5, u64::MAX, "at least 5"),
        ];
        for (field, value, min, max, expected) in bounds {
            if !(min..=max).contains(&value) {
                return Err(SettingsError::out_of_range(field, value, expected));
            }
        }
        Ok(())
    }

    /// Merges a partial JSON object over these settings and validates the
    /// result.
    ///
    /// Keys use the same camelCase names as the serialised form. Absent keys
    /// keep their current value.
    ///
    /// # Errors
    ///
    /// Rejects patches that are not objects, that name unknown settings, whose
    /// values have the wrong type, or whose merged result fails
    /// [`validate`](Self::validate).
    pub fn merge_patch(&self, patch: &Value) -> Result<Self, SettingsError> {
        let Value::Object(patch) = patch else {
            return Err(SettingsError::NotAnObject);
        };
        let mut merged = self.to_object()?;
        for (key, value) in patch {
            if !merged.contains_key(key) {
                return Err(SettingsError::UnknownSetting { key: key.clone() });
            }
            merged.insert(key.clone(), value.clone());
        }
        let settings: Self = serde_json::from_value(Value::Object(merged))
            .map_err(|source| SettingsError::Malformed { source })?;
        settings.validate()?;
        Ok(settings)
    }

    fn to_object(&self) -> Result<Map<String, Value>, SettingsError> {
        match serde_json::to_value(self).map_err(|source| SettingsError::Malformed { source })? {
            Value::Object(fields) => Ok(fields),
            _ => Err(SettingsError::NotAnObject),
        }
    }
}

/// Reasons a settings update is rejected.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The patch was not a JSON object.
    #[error("settings patch must be a JSON object")]
    NotAnObject,
    /// The patch named a setting that does not exist.
    #[error("unknown setting `{key}`")]
    UnknownSetting {
        /// Offending key.
        key: String,
    },
    /// A value had the wrong type.
    #[error("invalid settings value: {source}")]
    Malformed {
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A value was outside the accepted range.
    #[error("setting `{field}` is {value}; expected {expected}")]
    OutOfRange {
        /// Offending setting.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Accepted range.
        expected: &'static str,
    },
}

impl SettingsError {
    const fn out_of_range(field: &'static str, value: u64, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value,
            expected,
        }
    }
}
