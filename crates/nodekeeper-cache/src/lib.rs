//! In-memory caches that protect the node's control interface from load.
//!
//! Two shapes are provided:
//!
//! - [`TtlCache`] memoises a fallible producer per key for a caller-supplied
//!   time-to-live. Concurrent callers asking for the same key while a value
//!   is being produced block on the in-flight production instead of starting
//!   their own, so the backend sees at most one call per key per window.
//! - [`BoundedRecencyCache`] keeps a fixed number of entries and evicts the
//!   smallest keys first. Keys are expected to be domain-ordered (block
//!   heights), so only a sliding window of recent entries is retained.
//!
//! Both caches read time through the [`Clock`] trait so tests can drive
//! expiry without sleeping.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use nodekeeper_cache::TtlCache;
//!
//! let cache: TtlCache<&str, u64> = TtlCache::new();
//! let height = cache.get("blockcount", Duration::from_secs(5), || {
//!     Ok::<_, std::io::Error>(840_000)
//! });
//! assert_eq!(height.ok(), Some(840_000));
//! ```

pub mod clock;
pub mod recency;
pub mod ttl;

pub use self::clock::{Clock, SystemClock};
pub use self::recency::BoundedRecencyCache;
pub use self::ttl::TtlCache;

#[cfg(any(test, feature = "test-support"))]
pub use self::clock::ManualClock;
