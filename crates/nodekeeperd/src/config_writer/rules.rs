//! Cross-setting constraints applied before anything is written.

use super::settings::{Network, Settings};

/// Adjusts `settings` so mutually dependent options agree.
///
/// * Serving compact block filters requires the filter index.
/// * Pruning is incompatible with the transaction index.
/// * Proxying clearnet through Tor only makes sense when both are enabled for
///   outbound connections.
///
/// Applying the rules twice gives the same result as applying them once.
#[must_use]
pub fn apply_rules(mut settings: Settings) -> Settings {
    if settings.peer_block_filters {
        settings.block_filter_index = true;
    }
    if settings.prune > 0 {
        settings.tx_index = false;
    }
    let outgoing = &settings.outgoing_connections;
    if !(outgoing.contains(&Network::Clearnet) && outgoing.contains(&Network::Tor)) {
        settings.tor_proxy_for_clearnet = false;
    }
    settings
}
