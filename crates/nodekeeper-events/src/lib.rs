//! Domain events published by the nodekeeper supervisor.
//!
//! These types are the contract between the supervisor and its downstream
//! consumers (UI transports, notification relays). They serialise to JSON
//! objects tagged by a `type` field with camelCase keys:
//!
//! ```json
//! {"type":"block","hash":"00…","height":840000,"txCount":3050,"time":1713571767}
//! ```

use serde::{Deserialize, Serialize};

/// Record of an unexpected node exit.
///
/// Built once per crash with a copy of the log lines captured before the
/// process died, so the copy stays stable while the next run logs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInfo {
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
    /// Name of the terminating signal, such as `SIGKILL`.
    pub signal: Option<String>,
    /// Human-readable summary of the exit.
    pub message: String,
    /// Most recent log lines, oldest first.
    pub logs: Vec<String>,
}

/// Header metadata for a newly connected block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAnnouncement {
    /// Block hash in display (big-endian hex) order.
    pub hash: String,
    /// Height of the block in the active chain.
    pub height: u64,
    /// Number of transactions in the block.
    pub tx_count: u64,
    /// Block timestamp in seconds since the Unix epoch.
    pub time: u64,
}

/// Coalesced signal that transactions reached the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionActivity {
    /// Transactions announced since the previous signal.
    pub count: u64,
    /// Mempool transaction count at emission time, when it could be read.
    pub mempool_size: Option<u64>,
}

/// Normalised notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// Current supervisor state, sent once to each new subscriber.
    Snapshot {
        /// Whether the node process is live.
        running: bool,
        /// The most recent unexpected exit, if any is retained.
        exit: Option<ExitInfo>,
    },
    /// The node exited without being asked to.
    Exit(ExitInfo),
    /// A new block was connected.
    Block(BlockAnnouncement),
    /// Transactions arrived since the previous activity signal.
    Transactions(TransactionActivity),
}

impl DomainEvent {
    /// Wire name of the event type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Exit(_) => "exit",
            Self::Block(_) => "block",
            Self::Transactions(_) => "transactions",
        }
    }
}
