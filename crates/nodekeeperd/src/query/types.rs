//! Aggregated views returned by the query facade.

use serde::Serialize;

use crate::rpc::types::{BlockFeeStats, BlockHeader, PeerInfo};

/// Connected peers by direction and network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    /// All connected peers.
    pub total: u64,
    /// Peers that connected to us.
    pub inbound: u64,
    /// Peers we connected to.
    pub outbound: u64,
    /// Peers reached over IPv4 or IPv6.
    pub clearnet: u64,
    /// Peers reached over Tor.
    pub tor: u64,
    /// Peers reached over I2P.
    pub i2p: u64,
}

impl PeerSummary {
    /// Tallies `peers`.
    #[must_use]
    pub fn from_peers(peers: &[PeerInfo]) -> Self {
        peers.iter().fold(Self::default(), |mut summary, peer| {
            summary.total += 1;
            if peer.inbound {
                summary.inbound += 1;
            } else {
                summary.outbound += 1;
            }
            match peer.network.as_str() {
                "ipv4" | "ipv6" => summary.clearnet += 1,
                "onion" => summary.tor += 1,
                "i2p" => summary.i2p += 1,
                _ => {}
            }
            summary
        })
    }
}

/// Compact description of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    /// Block hash, hex encoded.
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Number of transactions.
    pub tx_count: u64,
    /// Block timestamp in seconds since the Unix epoch.
    pub time: u64,
}

impl From<BlockHeader> for BlockSummary {
    fn from(header: BlockHeader) -> Self {
        Self {
            hash: header.hash,
            height: header.height,
            tx_count: header.tx_count,
            time: header.time,
        }
    }
}

/// Suggested fee rates in sat/vB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeTiers {
    /// Median of the per-block 10th percentile.
    pub low: u64,
    /// Median of the per-block 50th percentile.
    pub medium: u64,
    /// Median of the per-block 90th percentile.
    pub high: u64,
    /// Number of blocks the tiers were computed from.
    pub blocks: usize,
}

impl FeeTiers {
    /// Computes tiers from per-block statistics; `None` when `stats` is empty.
    #[must_use]
    pub fn from_stats(stats: &[BlockFeeStats]) -> Option<Self> {
        Some(Self {
            low: median(stats.iter().map(BlockFeeStats::p10))?,
            medium: median(stats.iter().map(BlockFeeStats::p50))?,
            high: median(stats.iter().map(BlockFeeStats::p90))?,
            blocks: stats.len(),
        })
    }
}

/// Upper median of `values`.
fn median(values: impl Iterator<Item = u64>) -> Option<u64> {
    let mut sorted: Vec<u64> = values.collect();
    sorted.sort_unstable();
    sorted.get(sorted.len() / 2).copied()
}
