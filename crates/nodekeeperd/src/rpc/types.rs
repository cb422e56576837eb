//! Response shapes for the control commands issued by the daemon.
//!
//! Only the fields the daemon reads are declared; everything else in the
//! node's responses is ignored during decoding.

use serde::Deserialize;

/// `getblockchaininfo` result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockchainInfo {
    /// Chain name as reported by the node (`main`, `test`, ...).
    pub chain: String,
    /// Height of the validated tip.
    pub blocks: u64,
    /// Height of the best known header.
    pub headers: u64,
    /// Estimated verification progress in `[0, 1]`.
    #[serde(rename = "verificationprogress")]
    pub verification_progress: f64,
    /// `true` while the node is catching up with the network.
    #[serde(rename = "initialblockdownload")]
    pub initial_block_download: bool,
    /// Whether block files are pruned.
    #[serde(default)]
    pub pruned: bool,
    /// Bytes used by block and undo files.
    #[serde(default)]
    pub size_on_disk: u64,
}

/// `getmempoolinfo` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MempoolInfo {
    /// `true` once the persisted mempool has been loaded.
    pub loaded: bool,
    /// Number of transactions in the mempool.
    pub size: u64,
    /// Sum of virtual transaction sizes.
    #[serde(default)]
    pub bytes: u64,
}

/// `getblockheader` result (verbose form).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockHeader {
    /// Block hash, hex encoded.
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Number of transactions in the block.
    #[serde(rename = "nTx")]
    pub tx_count: u64,
    /// Block timestamp in seconds since the Unix epoch.
    pub time: u64,
}

/// One entry of the `getpeerinfo` result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerInfo {
    /// `true` for inbound connections.
    pub inbound: bool,
    /// Network the peer is reached over (`ipv4`, `ipv6`, `onion`, `i2p`, ...).
    #[serde(default)]
    pub network: String,
}

/// `getblockstats` result restricted to fee-rate percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BlockFeeStats {
    /// Block height.
    pub height: u64,
    /// Fee rates in sat/vB at the 10th, 25th, 50th, 75th, and 90th
    /// percentiles of block weight.
    pub feerate_percentiles: [u64; 5],
}

impl BlockFeeStats {
    /// Fee rate at the 10th percentile.
    #[must_use]
    pub const fn p10(&self) -> u64 {
        self.feerate_percentiles[0]
    }

    /// Fee rate at the 50th percentile.
    #[must_use]
    pub const fn p50(&self) -> u64 {
        self.feerate_percentiles[2]
    }

    /// Fee rate at the 90th percentile.
    #[must_use]
    pub const fn p90(&self) -> u64 {
        self.feerate_percentiles[4]
    }
}
