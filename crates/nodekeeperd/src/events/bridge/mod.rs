//! Translation of node push notifications into domain events.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nodekeeper_cache::{Clock, SystemClock};
use nodekeeper_events::{BlockAnnouncement, DomainEvent, TransactionActivity};
use serde_json::json;
use tracing::{error, info, warn};

use super::gate::wait_until_ready;
use super::{ActivityCoalescer, BridgeError, CancellationFlag, EVENTS_TARGET, EventHub};
use crate::rpc::types::{BlockHeader, MempoolInfo};
use crate::rpc::{ControlClient, ControlClientExt, NotificationSource, RawNotification, Topic};

const BLOCK_HASH_LEN: usize = 32;

/// Timing parameters for the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Delay between readiness probes while the transaction channel is gated.
    pub gate_interval: Duration,
    /// Minimum spacing between transaction activity events.
    pub activity_interval: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            gate_interval: Duration::from_secs(5),
            activity_interval: Duration::from_secs(1),
        }
    }
}

/// Feeds an [`EventHub`] from the node's notification channel.
///
/// The block and transaction channels run independently, normally on their
/// own threads via [`EventBridge::spawn`]. Each runs until its notification
/// stream fails or ends, which is reported as a [`BridgeError`], or until
/// the bridge's [`CancellationFlag`] is raised.
pub struct EventBridge {
    client: Arc<dyn ControlClient>,
    source: Arc<dyn NotificationSource>,
    hub: Arc<EventHub>,
    clock: Arc<dyn Clock>,
    settings: BridgeSettings,
    cancel: CancellationFlag,
}

impl EventBridge {
    /// Builds a bridge with default timings and the system clock.
    #[must_use]
    pub fn new(
        client: Arc<dyn ControlClient>,
        source: Arc<dyn NotificationSource>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            client,
            source,
            hub,
            clock: Arc::new(SystemClock),
            settings: BridgeSettings::default(),
            cancel: CancellationFlag::new(),
        }
    }

    /// Replaces the clock used for gating delays and rate limiting.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the timing parameters.
    #[must_use]
    pub const fn with_settings(mut self, settings: BridgeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `cancel` to stop the channels.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that stops both channels when raised.
    #[must_use]
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Runs both channels on dedicated threads.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Thread`] when a worker cannot be spawned. The
    /// cancellation flag is raised in that case so any worker already
    /// started winds down.
    pub fn spawn(self: Arc<Self>) -> Result<BridgeHandles, BridgeError> {
        let blocks = Arc::clone(&self);
        let block = thread::Builder::new()
            .name("bridge-hashblock".to_owned())
            .spawn(move || blocks.run_block_channel())
            .map_err(|source| BridgeError::Thread {
                topic: Topic::HashBlock,
                source,
            })?;
        let transactions = Arc::clone(&self);
        let spawned = thread::Builder::new()
            .name("bridge-hashtx".to_owned())
            .spawn(move || transactions.run_transaction_channel());
        match spawned {
            Ok(transaction) => Ok(BridgeHandles { block, transaction }),
            Err(source) => {
                self.cancel.cancel();
                Err(BridgeError::Thread {
                    topic: Topic::HashTx,
                    source,
                })
            }
        }
    }

    /// Publishes a block announcement for every block notification.
    ///
    /// # Errors
    ///
    /// Returns an error when the subscription cannot be opened or when the
    /// stream fails or ends. Returns `Ok(())` only after cancellation.
    pub fn run_block_channel(&self) -> Result<(), BridgeError> {
        self.consume(Topic::HashBlock, |notification| {
            self.announce_block(&notification);
        })
    }

    /// Publishes coalesced transaction activity once the node is ready.
    ///
    /// The subscription is opened only after the node reports that initial
    /// block download has finished and the mempool is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error when the subscription cannot be opened or when the
    /// stream fails or ends. Returns `Ok(())` only after cancellation.
    pub fn run_transaction_channel(&self) -> Result<(), BridgeError> {
        let ready = wait_until_ready(
            self.client.as_ref(),
            self.clock.as_ref(),
            self.settings.gate_interval,
            &self.cancel,
        );
        if !ready {
            return Ok(());
        }
        let mut coalescer = ActivityCoalescer::new(self.settings.activity_interval);
        self.consume(Topic::HashTx, |_| {
            if let Some(count) = coalescer.record(self.clock.now()) {
                self.announce_activity(count);
            }
        })
    }

    fn consume<F>(&self, topic: Topic, mut handle: F) -> Result<(), BridgeError>
    where
        F: FnMut(RawNotification),
    {
        let stream = self.source.subscribe(topic).map_err(|source| {
            error!(target: EVENTS_TARGET, %topic, error = %source, "subscription failed");
            BridgeError::Subscribe { topic, source }
        })?;
        info!(target: EVENTS_TARGET, %topic, "subscribed to notifications");

        for item in stream {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            match item {
                Ok(notification) => handle(notification),
                Err(source) => {
                    error!(target: EVENTS_TARGET, %topic, error = %source, "notification stream failed");
                    return Err(BridgeError::Stream { topic, source });
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Ok(());
        }
        error!(target: EVENTS_TARGET, %topic, "notification stream ended");
        Err(BridgeError::StreamEnded { topic })
    }

    fn announce_block(&self, notification: &RawNotification) {
        if notification.payload.len() != BLOCK_HASH_LEN {
            warn!(
                target: EVENTS_TARGET,
                length = notification.payload.len(),
                "ignoring block notification with malformed hash"
            );
            return;
        }
        let hash = hex::encode(&notification.payload);
        match self
            .client
            .call::<BlockHeader>("getblockheader", vec![json!(hash)])
        {
            Ok(header) => {
                let delivered = self.hub.publish(DomainEvent::Block(BlockAnnouncement {
                    hash: header.hash,
                    height: header.height,
                    tx_count: header.tx_count,
                    time: header.time,
                }));
                info!(
                    target: EVENTS_TARGET,
                    height = header.height,
                    delivered,
                    "block announced"
                );
            }
            Err(error) => {
                warn!(target: EVENTS_TARGET, %hash, %error, "dropping block notification");
            }
        }
    }

    fn announce_activity(&self, count: u64) {
        let mempool_size = match self.client.call::<MempoolInfo>("getmempoolinfo", Vec::new()) {
            Ok(mempool) => Some(mempool.size),
            Err(error) => {
                warn!(target: EVENTS_TARGET, %error, "mempool size unavailable");
                None
            }
        };
        self.hub
            .publish(DomainEvent::Transactions(TransactionActivity {
                count,
                mempool_size,
            }));
    }
}

/// Join handles for the two bridge channels.
#[derive(Debug)]
pub struct BridgeHandles {
    block: JoinHandle<Result<(), BridgeError>>,
    transaction: JoinHandle<Result<(), BridgeError>>,
}

impl BridgeHandles {
    /// Waits for both channels and returns their outcomes (block first).
    pub fn join(self) -> (Result<(), BridgeError>, Result<(), BridgeError>) {
        let block = self.block.join().unwrap_or(Err(BridgeError::Panicked {
            topic: Topic::HashBlock,
        }));
        let transaction = self.transaction.join().unwrap_or(Err(BridgeError::Panicked {
            topic: Topic::HashTx,
        }));
        (block, transaction)
    }
}
