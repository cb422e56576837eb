//! Seams to the node's control interface and push-notification channel.
//!
//! The supervisor never speaks the node's wire protocols directly. Callers
//! hand it a [`ControlClient`] for request/response commands and a
//! [`NotificationSource`] for topic subscriptions; both transports live
//! outside this crate. Typed response shapes for the commands the daemon
//! issues are defined in [`types`].

mod errors;
pub mod types;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use errors::{RpcError, TransportError};

/// One command in a batched request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    /// Command name, for example `getblockhash`.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

impl RpcCall {
    /// Builds a call from a method name and positional parameters.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Request/response access to the node's control interface.
pub trait ControlClient: Send + Sync {
    /// Issues a single command and returns its raw result.
    fn command(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;

    /// Issues several commands, returning one result per call in call order.
    ///
    /// The outer error reports a failure of the whole batch. The default
    /// implementation issues the calls one by one; transports supporting
    /// native batching should override it.
    fn batch(&self, calls: Vec<RpcCall>) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        Ok(calls
            .into_iter()
            .map(|call| self.command(&call.method, call.params))
            .collect())
    }
}

impl<T> ControlClient for Arc<T>
where
    T: ControlClient + ?Sized,
{
    fn command(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        (**self).command(method, params)
    }

    fn batch(&self, calls: Vec<RpcCall>) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        (**self).batch(calls)
    }
}

/// Typed helpers layered over [`ControlClient`].
pub trait ControlClientExt: ControlClient {
    /// Issues `method` and decodes its result into `R`.
    fn call<R>(&self, method: &str, params: Vec<Value>) -> Result<R, RpcError>
    where
        R: DeserializeOwned,
    {
        let value = self.command(method, params)?;
        decode(method, value)
    }
}

impl<T> ControlClientExt for T where T: ControlClient + ?Sized {}

/// Decodes a raw command result into `R`.
pub(crate) fn decode<R>(method: &str, value: Value) -> Result<R, RpcError>
where
    R: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|error| RpcError::Decode {
        method: method.to_owned(),
        message: error.to_string(),
    })
}

/// Push-notification topics the node publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Hash of each newly connected block.
    HashBlock,
    /// Hash of each transaction entering the mempool or a block.
    HashTx,
}

impl Topic {
    /// Wire name of the topic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HashBlock => "hashblock",
            Self::HashTx => "hashtx",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A single message received on a notification topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    /// Topic the message arrived on.
    pub topic: Topic,
    /// Message body; a 32-byte hash for the hash topics.
    pub payload: Vec<u8>,
    /// Publisher sequence number, when the transport carries one.
    pub sequence: Option<u32>,
}

/// Blocking stream of notifications for one topic.
///
/// The stream ends (`None`) when the transport closes; an `Err` item reports
/// a transport failure. Both are treated as fatal by consumers.
pub type NotificationStream = Box<dyn Iterator<Item = Result<RawNotification, TransportError>> + Send>;

/// Subscription access to the node's push-notification channel.
pub trait NotificationSource: Send + Sync {
    /// Opens a subscription to `topic`.
    fn subscribe(&self, topic: Topic) -> Result<NotificationStream, TransportError>;
}

impl<T> NotificationSource for Arc<T>
where
    T: NotificationSource + ?Sized,
{
    fn subscribe(&self, topic: Topic) -> Result<NotificationStream, TransportError> {
        (**self).subscribe(topic)
    }
}
