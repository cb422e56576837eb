//! Rendering of settings into the node's overlay configuration file.

use std::fmt::Display;

use nodekeeper_config::{Chain, Config};

use super::settings::{Network, Settings};

/// Deployment facts the overlay needs besides the settings themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEnvironment {
    /// Chain whose section receives the bind directives.
    pub chain: Chain,
    /// `host:port` of the Tor SOCKS proxy.
    pub tor_proxy: String,
    /// `host:port` of the Tor control port.
    pub tor_control: String,
    /// Tor control password.
    pub tor_control_password: String,
    /// `host:port` of the I2P SAM bridge.
    pub i2p_sam: String,
    /// Peer allow-list in CIDR notation.
    pub peer_allowlist: String,
}

impl OverlayEnvironment {
    /// Extracts the overlay environment from the supervisor configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            chain: config.chain,
            tor_proxy: config.tor_proxy_address(),
            tor_control: config.tor_control_address(),
            tor_control_password: config.tor_control_password.clone(),
            i2p_sam: config.i2p_sam_address(),
            peer_allowlist: config.peer_allowlist.clone(),
        }
    }
}

impl Default for OverlayEnvironment {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Ordered `key=value` directives for the global section.
#[derive(Debug, Default)]
struct Directives {
    entries: Vec<(&'static str, String)>,
}

impl Directives {
    fn set(&mut self, key: &'static str, value: impl Display) {
        self.entries.push((key, value.to_string()));
    }

    fn flag(&mut self, key: &'static str, enabled: bool) {
        self.set(key, u8::from(enabled));
    }

    fn remove(&mut self, key: &str) {
        self.entries.retain(|(existing, _)| *existing != key);
    }

    fn into_text(self) -> String {
        self.entries
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Renders the overlay file for `settings`.
///
/// The output depends only on its inputs, so rendering the same settings
/// twice yields byte-identical text. Settings are expected to have passed
/// through [`apply_rules`](super::apply_rules) first.
#[must_use]
pub fn render_overlay(settings: &Settings, environment: &OverlayEnvironment) -> String {
    let mut directives = Directives::default();
    push_scalars(&mut directives, settings);

    for network in &settings.outgoing_connections {
        for name in network.onlynet_names() {
            directives.set("onlynet", name);
        }
    }

    let incoming = &settings.incoming_connections;
    directives.flag("listen", true);
    directives.flag("discover", incoming.contains(&Network::Clearnet));
    directives.flag("listenonion", incoming.contains(&Network::Tor));
    directives.flag("i2pacceptincoming", incoming.contains(&Network::I2p));

    directives.remove("proxy");
    if settings.tor_proxy_for_clearnet {
        directives.set("proxy", &environment.tor_proxy);
    }

    directives.set("whitelist", &environment.peer_allowlist);

    let tor_out = settings.outgoing_connections.contains(&Network::Tor);
    let tor_in = incoming.contains(&Network::Tor);
    directives.remove("onion");
    directives.remove("torcontrol");
    directives.remove("torpassword");
    if tor_out || tor_in {
        directives.set("onion", &environment.tor_proxy);
    }
    if tor_in {
        directives.set("torcontrol", &environment.tor_control);
        directives.set("torpassword", &environment.tor_control_password);
    }

    directives.remove("i2psam");
    if settings.outgoing_connections.contains(&Network::I2p) || incoming.contains(&Network::I2p) {
        directives.set("i2psam", &environment.i2p_sam);
    }

    let port = environment.chain.p2p_port();
    format!(
        "{global}\n\n[{section}]\nbind=0.0.0.0:{port}\nbind=127.0.0.1:{onion_port}=onion\n",
        global = directives.into_text(),
        section = environment.chain.section(),
        onion_port = port.saturating_add(1),
    )
}

fn push_scalars(directives: &mut Directives, settings: &Settings) {
    directives.flag("peerblockfilters", settings.peer_block_filters);
    directives.flag("blockfilterindex", settings.block_filter_index);
    directives.flag("peerbloomfilters", settings.peer_bloom_filters);
    directives.set("bantime", settings.bantime);
    directives.set("maxconnections", settings.max_connections);
    directives.set("maxreceivebuffer", settings.max_receive_buffer);
    directives.set("maxsendbuffer", settings.max_send_buffer);
    directives.set("peertimeout", settings.peer_timeout);
    directives.set("timeout", settings.timeout);
    directives.set("maxuploadtarget", settings.max_upload_target);
    directives.set("dbcache", settings.db_cache);
    directives.set("prune", settings.prune);
    directives.flag("txindex", settings.tx_index);
    directives.flag("mempoolfullrbf", settings.mempool_full_rbf);
    directives.flag("datacarrier", settings.data_carrier);
    directives.set("datacarriersize", settings.data_carrier_size);
    directives.flag("permitbaremultisig", settings.permit_bare_multisig);
    directives.set("maxmempool", settings.max_mempool);
    directives.set("mempoolexpiry", settings.mempool_expiry);
    directives.flag("persistmempool", settings.persist_mempool);
    directives.flag("blocksonly", settings.blocks_only);
    directives.flag("rest", settings.rest);
    directives.set("rpcworkqueue", settings.rpc_work_queue);
}
