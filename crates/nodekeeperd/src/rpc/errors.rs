//! Error types for the control and notification seams.

use thiserror::Error;

use super::Topic;

/// Failures reported by a [`ControlClient`](super::ControlClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The control interface could not be reached.
    #[error("control interface unreachable: {message}")]
    Unreachable {
        /// Transport-level description.
        message: String,
    },
    /// The node rejected the command.
    #[error("node rejected command ({code}): {message}")]
    Server {
        /// Error code returned by the node.
        code: i64,
        /// Error message returned by the node.
        message: String,
    },
    /// The response did not have the expected shape.
    #[error("failed to decode `{method}` response: {message}")]
    Decode {
        /// Command whose response failed to decode.
        method: String,
        /// Decoder message.
        message: String,
    },
}

impl RpcError {
    /// Builds an [`RpcError::Unreachable`].
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Builds an [`RpcError::Server`].
    #[must_use]
    pub fn server(code: i64, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }
}

/// Failures reported by a [`NotificationSource`](super::NotificationSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Opening a subscription failed.
    #[error("failed to subscribe to `{topic}`: {message}")]
    Subscribe {
        /// Requested topic.
        topic: Topic,
        /// Transport description.
        message: String,
    },
    /// Receiving from an open subscription failed.
    #[error("notification receive failed: {message}")]
    Receive {
        /// Transport description.
        message: String,
    },
}
