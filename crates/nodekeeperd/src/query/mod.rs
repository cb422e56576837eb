//! Cached read access to node state.
//!
//! Chain and peer summaries are memoised for a few seconds so bursts of
//! callers share one control call. Per-block data never changes once a
//! height is buried, so block summaries and fee statistics are kept in
//! height-keyed recency caches and only missing heights are fetched, in one
//! batch per command.

mod types;

use std::sync::Arc;
use std::time::Duration;

use nodekeeper_cache::{BoundedRecencyCache, Clock, SystemClock, TtlCache};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

pub use types::{BlockSummary, FeeTiers, PeerSummary};

use crate::rpc::types::{BlockFeeStats, BlockHeader, BlockchainInfo, PeerInfo};
use crate::rpc::{ControlClient, ControlClientExt, RpcCall, RpcError, decode};

const QUERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::query");

/// Lifetime of memoised chain, peer, and tip answers.
pub const QUERY_TTL: Duration = Duration::from_secs(5);

/// Number of heights retained by the per-block caches.
pub const HEIGHT_CACHE_CAPACITY: usize = 256;

/// Failures reported by [`QueryFacade`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// The control interface failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// No data was available for the requested window.
    #[error("no {what} available")]
    Empty {
        /// Kind of data that was missing.
        what: &'static str,
    },
}

type SharedClock = Arc<dyn Clock>;

/// Read-through caches in front of a [`ControlClient`].
pub struct QueryFacade {
    client: Arc<dyn ControlClient>,
    chain: TtlCache<(), BlockchainInfo, SharedClock>,
    peers: TtlCache<(), PeerSummary, SharedClock>,
    tip: TtlCache<(), u64, SharedClock>,
    blocks: BoundedRecencyCache<u64, BlockSummary>,
    fees: BoundedRecencyCache<u64, BlockFeeStats>,
}

impl QueryFacade {
    /// Builds a facade using the system clock.
    #[must_use]
    pub fn new(client: Arc<dyn ControlClient>) -> Self {
        Self::with_clock(client, Arc::new(SystemClock))
    }

    /// Builds a facade whose memoisation reads time from `clock`.
    #[must_use]
    pub fn with_clock(client: Arc<dyn ControlClient>, clock: SharedClock) -> Self {
        Self {
            client,
            chain: TtlCache::with_clock(Arc::clone(&clock)),
            peers: TtlCache::with_clock(Arc::clone(&clock)),
            tip: TtlCache::with_clock(clock),
            blocks: BoundedRecencyCache::new(HEIGHT_CACHE_CAPACITY),
            fees: BoundedRecencyCache::new(HEIGHT_CACHE_CAPACITY),
        }
    }

    /// Chain synchronisation state.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Rpc`] when the node cannot answer.
    pub fn sync_status(&self) -> Result<BlockchainInfo, QueryError> {
        let info = self.chain.get((), QUERY_TTL, || {
            self.client.call::<BlockchainInfo>("getblockchaininfo", Vec::new())
        })?;
        Ok(info)
    }

    /// Connected peers grouped by direction and network.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Rpc`] when the node cannot answer.
    pub fn peer_summary(&self) -> Result<PeerSummary, QueryError> {
        let summary = self.peers.get((), QUERY_TTL, || {
            self.client
                .call::<Vec<PeerInfo>>("getpeerinfo", Vec::new())
                .map(|peers| PeerSummary::from_peers(&peers))
        })?;
        Ok(summary)
    }

    /// Summaries of the `limit` most recent blocks, newest first.
    ///
    /// `limit` is capped at [`HEIGHT_CACHE_CAPACITY`]. Blocks whose lookup
    /// fails individually are left out.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Rpc`] when the tip or a whole batch cannot be
    /// fetched.
    pub fn latest_blocks(&self, limit: usize) -> Result<Vec<BlockSummary>, QueryError> {
        let heights = self.recent_heights(limit)?;
        let missing: Vec<u64> = heights
            .iter()
            .copied()
            .filter(|height| !self.blocks.contains(height))
            .collect();
        if !missing.is_empty() {
            self.fetch_blocks(&missing)?;
        }
        Ok(heights
            .iter()
            .filter_map(|height| self.blocks.get(height))
            .collect())
    }

    /// Fee-rate tiers over the `window` most recent blocks.
    ///
    /// Each tier is the median across the window of one per-block
    /// percentile: the 10th for `low`, the 50th for `medium`, and the 90th
    /// for `high`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Rpc`] when the tip or the statistics batch
    /// cannot be fetched and [`QueryError::Empty`] when no block in the
    /// window has statistics.
    pub fn fee_tiers(&self, window: usize) -> Result<FeeTiers, QueryError> {
        let heights = self.recent_heights(window)?;
        let missing: Vec<u64> = heights
            .iter()
            .copied()
            .filter(|height| !self.fees.contains(height))
            .collect();
        if !missing.is_empty() {
            self.fetch_fee_stats(&missing)?;
        }
        let stats: Vec<BlockFeeStats> = heights
            .iter()
            .filter_map(|height| self.fees.get(height))
            .collect();
        FeeTiers::from_stats(&stats).ok_or(QueryError::Empty {
            what: "fee statistics",
        })
    }

    fn tip_height(&self) -> Result<u64, QueryError> {
        let height = self.tip.get((), QUERY_TTL, || {
            self.client.call::<u64>("getblockcount", Vec::new())
        })?;
        Ok(height)
    }

    fn recent_heights(&self, count: usize) -> Result<Vec<u64>, QueryError> {
        let tip = self.tip_height()?;
        let count = u64::try_from(count.min(HEIGHT_CACHE_CAPACITY)).unwrap_or(0);
        Ok((0..count).map_while(|offset| tip.checked_sub(offset)).collect())
    }

    fn fetch_blocks(&self, heights: &[u64]) -> Result<(), QueryError> {
        debug!(target: QUERY_TARGET, count = heights.len(), "fetching block summaries");
        let hash_calls = heights
            .iter()
            .map(|height| RpcCall::new("getblockhash", vec![json!(height)]))
            .collect();
        let hashes: Vec<String> = self
            .batch_values("getblockhash", hash_calls)?
            .into_iter()
            .filter_map(|value| match value {
                Value::String(hash) => Some(hash),
                _ => None,
            })
            .collect();

        let header_calls = hashes
            .iter()
            .map(|hash| RpcCall::new("getblockheader", vec![json!(hash)]))
            .collect();
        for value in self.batch_values("getblockheader", header_calls)? {
            match decode::<BlockHeader>("getblockheader", value) {
                Ok(header) => {
                    self.blocks.set(header.height, BlockSummary::from(header));
                }
                Err(error) => warn!(target: QUERY_TARGET, %error, "skipping block header"),
            }
        }
        Ok(())
    }

    fn fetch_fee_stats(&self, heights: &[u64]) -> Result<(), QueryError> {
        debug!(target: QUERY_TARGET, count = heights.len(), "fetching fee statistics");
        let calls = heights
            .iter()
            .map(|height| {
                RpcCall::new(
                    "getblockstats",
                    vec![json!(height), json!(["height", "feerate_percentiles"])],
                )
            })
            .collect();
        for value in self.batch_values("getblockstats", calls)? {
            match decode::<BlockFeeStats>("getblockstats", value) {
                Ok(stats) => {
                    self.fees.set(stats.height, stats);
                }
                Err(error) => warn!(target: QUERY_TARGET, %error, "skipping block statistics"),
            }
        }
        Ok(())
    }

    /// Issues a batch, logging and dropping per-call failures.
    fn batch_values(&self, method: &str, calls: Vec<RpcCall>) -> Result<Vec<Value>, QueryError> {
        let results = self.client.batch(calls)?;
        Ok(results
            .into_iter()
            .filter_map(|result| match result {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(target: QUERY_TARGET, method, %error, "batched call failed");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests;
