//! Scripted stand-ins for the node's control and notification interfaces.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::rpc::{
    ControlClient, NotificationSource, NotificationStream, RawNotification, RpcCall, RpcError,
    Topic, TransportError,
};

type Responder = dyn Fn(&str, &[Value]) -> Result<Value, RpcError> + Send + Sync;

/// Control client answering every command from a closure and recording it.
pub struct ScriptedControlClient {
    responder: Box<Responder>,
    calls: Mutex<Vec<RpcCall>>,
    batches: AtomicUsize,
}

impl ScriptedControlClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            batches: AtomicUsize::new(0),
        }
    }

    /// Every call issued so far, batched or not, in order.
    pub fn calls(&self) -> Vec<RpcCall> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    /// Method names of every call issued so far.
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.method).collect()
    }

    /// Number of calls issued for `method`.
    pub fn count(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// Number of batch requests received.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    fn answer(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let result = (self.responder)(method, &params);
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push(RpcCall::new(method, params));
        result
    }
}

impl ControlClient for ScriptedControlClient {
    fn command(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.answer(method, params)
    }

    fn batch(&self, calls: Vec<RpcCall>) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(calls
            .into_iter()
            .map(|call| self.answer(&call.method, call.params))
            .collect())
    }
}

/// Notification source handing out one prepared stream per topic.
///
/// Topics without a prepared stream, and second subscriptions to a topic,
/// fail to subscribe.
#[derive(Default)]
pub struct ScriptedNotificationSource {
    streams: Mutex<HashMap<Topic, NotificationStream>>,
    subscriptions: Mutex<Vec<Topic>>,
}

impl ScriptedNotificationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the stream returned for `topic`.
    #[must_use]
    pub fn with_stream<I>(self, topic: Topic, items: I) -> Self
    where
        I: IntoIterator<Item = Result<RawNotification, TransportError>>,
        I::IntoIter: Send + 'static,
    {
        self.prepare(topic, items);
        self
    }

    /// Prepares the stream returned for `topic`, replacing any earlier one.
    pub fn prepare<I>(&self, topic: Topic, items: I)
    where
        I: IntoIterator<Item = Result<RawNotification, TransportError>>,
        I::IntoIter: Send + 'static,
    {
        self.streams
            .lock()
            .expect("stream map mutex poisoned")
            .insert(topic, Box::new(items.into_iter()));
    }

    /// Topics subscribed to so far, in order.
    pub fn subscriptions(&self) -> Vec<Topic> {
        self.subscriptions
            .lock()
            .expect("subscription log mutex poisoned")
            .clone()
    }
}

impl NotificationSource for ScriptedNotificationSource {
    fn subscribe(&self, topic: Topic) -> Result<NotificationStream, TransportError> {
        self.subscriptions
            .lock()
            .expect("subscription log mutex poisoned")
            .push(topic);
        self.streams
            .lock()
            .expect("stream map mutex poisoned")
            .remove(&topic)
            .ok_or_else(|| TransportError::Subscribe {
                topic,
                message: "connection refused".to_owned(),
            })
    }
}

/// Deterministic hash for the block at `height`.
pub fn block_hash_for(height: u64) -> String {
    format!("{height:064x}")
}

/// `getblockheader` response for the block at `height`.
pub fn block_header(height: u64) -> Value {
    json!({
        "hash": block_hash_for(height),
        "confirmations": 1,
        "height": height,
        "nTx": height % 3_000 + 1,
        "time": 1_700_000_000 + height * 600,
    })
}

/// `getblockchaininfo` response at tip `blocks`.
pub fn blockchain_info(blocks: u64, initial_block_download: bool) -> Value {
    let progress = if initial_block_download { 0.5 } else { 1.0 };
    json!({
        "chain": "main",
        "blocks": blocks,
        "headers": blocks,
        "verificationprogress": progress,
        "initialblockdownload": initial_block_download,
        "pruned": false,
        "size_on_disk": 600_000_000_000_u64,
    })
}

/// `getmempoolinfo` response.
pub fn mempool_info(loaded: bool, size: u64) -> Value {
    json!({"loaded": loaded, "size": size, "bytes": size * 250})
}

/// Block notification carrying the raw hash of the block at `height`.
pub fn block_notification(height: u64) -> RawNotification {
    RawNotification {
        topic: Topic::HashBlock,
        payload: hex::decode(block_hash_for(height)).expect("hash is valid hex"),
        sequence: u32::try_from(height).ok(),
    }
}

/// Transaction notification with an arbitrary hash.
pub fn tx_notification(sequence: u32) -> RawNotification {
    RawNotification {
        topic: Topic::HashTx,
        payload: vec![0xab; 32],
        sequence: Some(sequence),
    }
}
