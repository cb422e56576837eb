//! Failures that stop an event bridge channel.

use std::io;

use thiserror::Error;

use crate::rpc::{Topic, TransportError};

/// Fatal conditions for a bridge channel.
///
/// Per-notification enrichment failures are logged and skipped; only
/// transport-level problems end a channel.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The subscription could not be opened.
    #[error("failed to subscribe to `{topic}`: {source}")]
    Subscribe {
        /// Topic being subscribed to.
        topic: Topic,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The transport failed while receiving.
    #[error("notification stream for `{topic}` failed: {source}")]
    Stream {
        /// Topic of the failed stream.
        topic: Topic,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The transport closed the stream.
    #[error("notification stream for `{topic}` ended")]
    StreamEnded {
        /// Topic of the closed stream.
        topic: Topic,
    },
    /// A channel worker thread could not be spawned.
    #[error("failed to spawn `{topic}` bridge thread: {source}")]
    Thread {
        /// Topic the worker would have served.
        topic: Topic,
        /// Spawn failure.
        #[source]
        source: io::Error,
    },
    /// A channel worker thread panicked.
    #[error("`{topic}` bridge thread panicked")]
    Panicked {
        /// Topic the worker served.
        topic: Topic,
    },
}
