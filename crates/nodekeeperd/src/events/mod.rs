//! Fan-out of domain events and translation of node notifications into them.
//!
//! [`EventHub`] broadcasts [`DomainEvent`](nodekeeper_events::DomainEvent)s
//! to any number of subscribers. [`EventBridge`] feeds it from the node's
//! push-notification channel: block hashes are enriched into block
//! announcements, and transaction notifications are rate-limited into
//! activity bursts once the node is ready to report them.

mod bridge;
mod cancel;
mod coalesce;
mod errors;
mod gate;
mod hub;

pub use bridge::{BridgeHandles, BridgeSettings, EventBridge};
pub use cancel::CancellationFlag;
pub use coalesce::ActivityCoalescer;
pub use errors::BridgeError;
pub use gate::{Readiness, probe_readiness};
pub use hub::{EventHub, Subscription, SubscriptionId};

pub(crate) const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");
