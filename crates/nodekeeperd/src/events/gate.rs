//! Readiness gating for transaction notifications.
//!
//! While the node is catching up, or before its persisted mempool has been
//! loaded, transaction notifications describe historical churn rather than
//! live activity. The transaction channel therefore only subscribes once both
//! conditions clear.

use std::time::Duration;

use nodekeeper_cache::Clock;
use tracing::{debug, info};

use super::{CancellationFlag, EVENTS_TARGET};
use crate::rpc::types::{BlockchainInfo, MempoolInfo};
use crate::rpc::{ControlClient, ControlClientExt};

/// Outcome of a single readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Initial block download has finished and the mempool is loaded.
    Ready,
    /// The node is still in initial block download.
    CatchingUp,
    /// The persisted mempool is still loading.
    MempoolLoading,
    /// The control interface could not answer the probe.
    Unavailable(String),
}

impl Readiness {
    /// Returns `true` for [`Readiness::Ready`].
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Asks the node whether live transaction activity can be reported.
pub fn probe_readiness(client: &dyn ControlClient) -> Readiness {
    let chain = match client.call::<BlockchainInfo>("getblockchaininfo", Vec::new()) {
        Ok(chain) => chain,
        Err(error) => return Readiness::Unavailable(error.to_string()),
    };
    if chain.initial_block_download {
        return Readiness::CatchingUp;
    }
    match client.call::<MempoolInfo>("getmempoolinfo", Vec::new()) {
        Ok(mempool) if mempool.loaded => Readiness::Ready,
        Ok(_) => Readiness::MempoolLoading,
        Err(error) => Readiness::Unavailable(error.to_string()),
    }
}

/// Polls [`probe_readiness`] every `interval` until the node is ready.
///
/// Returns `false` when `cancel` is raised before readiness is reached.
pub(crate) fn wait_until_ready(
    client: &dyn ControlClient,
    clock: &dyn Clock,
    interval: Duration,
    cancel: &CancellationFlag,
) -> bool {
    let mut polls: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            debug!(target: EVENTS_TARGET, polls, "readiness wait cancelled");
            return false;
        }
        polls += 1;
        let readiness = probe_readiness(client);
        if readiness.is_ready() {
            info!(target: EVENTS_TARGET, polls, "node ready for transaction activity");
            return true;
        }
        debug!(
            target: EVENTS_TARGET,
            polls,
            readiness = ?readiness,
            interval_ms = interval.as_millis(),
            "waiting for node readiness"
        );
        clock.sleep(interval);
    }
}
