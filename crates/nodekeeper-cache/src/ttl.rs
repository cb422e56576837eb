//! Time-bounded memoisation with single-flight production.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;

use crate::clock::{Clock, SystemClock};

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

/// One production attempt for a key. Callers sharing a slot share its value.
struct Slot<T> {
    cell: OnceCell<Entry<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.cell
            .get()
            .is_none_or(|entry| entry.expires_at > now)
    }
}

/// Key-scoped memoisation of a fallible producer.
///
/// A call to [`TtlCache::get`] returns the stored value while it is live.
/// Otherwise the producer runs, and every other caller requesting the same
/// key before it finishes blocks until the value is ready and receives a
/// clone of it. Expiry is measured from the moment production completes.
/// Failed productions are not stored; the next caller tries again.
pub struct TtlCache<K, T, C = SystemClock> {
    slots: Mutex<HashMap<K, Arc<Slot<T>>>>,
    clock: C,
}

impl<K, T> TtlCache<K, T, SystemClock>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Builds an empty cache using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K, T> Default for TtlCache<K, T, SystemClock>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, C> TtlCache<K, T, C>
where
    K: Eq + Hash + Clone,
    T: Clone,
    C: Clock,
{
    /// Builds an empty cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the live value for `key`, producing it when absent or expired.
    ///
    /// # Errors
    ///
    /// Returns the producer's error when production fails. Nothing is cached
    /// in that case.
    pub fn get<E, F>(&self, key: K, ttl: Duration, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.slot_for(&key);
        let produced = slot.cell.get_or_try_init(|| {
            let value = producer()?;
            Ok(Entry {
                value,
                expires_at: self.clock.now() + ttl,
            })
        });
        match produced {
            Ok(entry) => Ok(entry.value.clone()),
            Err(error) => {
                self.discard_unfilled(&key, &slot);
                Err(error)
            }
        }
    }

    /// Drops the entry for `key`, live or not.
    pub fn invalidate(&self, key: &K) {
        self.lock_slots().remove(key);
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.lock_slots();
        let before = slots.len();
        slots.retain(|_, slot| slot.is_live(now));
        before - slots.len()
    }

    /// Number of tracked keys, including in-flight and expired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    /// Returns `true` when no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }

    fn slot_for(&self, key: &K) -> Arc<Slot<T>> {
        let now = self.clock.now();
        let mut slots = self.lock_slots();
        if let Some(slot) = slots.get(key)
            && slot.is_live(now)
        {
            return Arc::clone(slot);
        }
        let slot = Arc::new(Slot::new());
        slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }

    fn discard_unfilled(&self, key: &K, slot: &Arc<Slot<T>>) {
        let mut slots = self.lock_slots();
        let stale = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.cell.get().is_none());
        if stale {
            slots.remove(key);
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Arc<Slot<T>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, T, C> fmt::Debug for TtlCache<K, T, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracked = self
            .slots
            .lock()
            .map_or(0, |slots| slots.len());
        formatter
            .debug_struct("TtlCache")
            .field("tracked", &tracked)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(10);

    #[fixture]
    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new())
    }

    fn counting_producer(
        calls: &AtomicUsize,
        value: u64,
    ) -> impl FnOnce() -> Result<u64, String> + '_ {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[rstest]
    fn live_entries_skip_the_producer(clock: Arc<ManualClock>) {
        let cache = TtlCache::with_clock(Arc::clone(&clock));
        let calls = AtomicUsize::new(0);

        let first = cache.get("tip", TTL, counting_producer(&calls, 1));
        clock.advance(Duration::from_secs(9));
        let second = cache.get("tip", TTL, counting_producer(&calls, 2));

        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn expired_entries_are_produced_again(clock: Arc<ManualClock>) {
        let cache = TtlCache::with_clock(Arc::clone(&clock));
        let calls = AtomicUsize::new(0);

        cache
            .get("tip", TTL, counting_producer(&calls, 1))
            .expect("first production");
        clock.advance(TTL);
        let refreshed = cache.get("tip", TTL, counting_producer(&calls, 2));

        assert_eq!(refreshed, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn keys_are_independent(clock: Arc<ManualClock>) {
        let cache = TtlCache::with_clock(clock);
        let calls = AtomicUsize::new(0);

        let a = cache.get("a", TTL, counting_producer(&calls, 1));
        let b = cache.get("b", TTL, counting_producer(&calls, 2));

        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(cache.len(), 2);
    }

    #[rstest]
    fn failures_are_not_cached(clock: Arc<ManualClock>) {
        let cache: TtlCache<&str, u64, _> = TtlCache::with_clock(clock);
        let calls = AtomicUsize::new(0);

        let failed = cache.get("tip", TTL, || Err::<u64, _>("unreachable".to_owned()));
        let recovered = cache.get("tip", TTL, counting_producer(&calls, 7));

        assert_eq!(failed, Err("unreachable".to_owned()));
        assert_eq!(recovered, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn invalidate_forces_fresh_production(clock: Arc<ManualClock>) {
        let cache = TtlCache::with_clock(clock);
        let calls = AtomicUsize::new(0);

        cache
            .get("tip", TTL, counting_producer(&calls, 1))
            .expect("first production");
        cache.invalidate(&"tip");
        let again = cache.get("tip", TTL, counting_producer(&calls, 2));

        assert_eq!(again, Ok(2));
        assert!(!cache.is_empty());
    }

    #[rstest]
    fn purge_drops_only_expired_entries(clock: Arc<ManualClock>) {
        let cache = TtlCache::with_clock(Arc::clone(&clock));
        let calls = AtomicUsize::new(0);

        cache
            .get("short", Duration::from_secs(1), counting_producer(&calls, 1))
            .expect("short entry");
        cache
            .get("long", Duration::from_secs(60), counting_producer(&calls, 2))
            .expect("long entry");
        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_production() {
        const CALLERS: usize = 8;
        let cache: Arc<TtlCache<&str, u64>> = Arc::new(TtlCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get("peers", TTL, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(100));
                        Ok::<_, String>(42)
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("caller thread panicked"))
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), CALLERS);
        assert!(results.iter().all(|result| *result == Ok(42)));
    }
}
