//! Bounded memo of analysis results keyed by a content hash of their inputs.

use super::series::{OscillatorPoint, PricePoint};
use super::signal::SignalParams;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CACHE_SIZE: usize = 50;

/// BLAKE3 digest over the price series, the oscillator series and the signal
/// parameters. Any change to a data file produces a different key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    pub fn new(prices: &[PricePoint], oscillator: &[OscillatorPoint], params: &SignalParams) -> Self {
        let mut hasher = blake3::Hasher::new();

        hasher.update(b"prices");
        hasher.update(&(prices.len() as u64).to_le_bytes());
        for p in prices {
            hasher.update(p.date.to_string().as_bytes());
            hasher.update(&p.open.to_le_bytes());
            hasher.update(&p.high.to_le_bytes());
            hasher.update(&p.low.to_le_bytes());
            hasher.update(&p.close.to_le_bytes());
            hasher.update(&p.volume.to_le_bytes());
        }

        hasher.update(b"oscillator");
        hasher.update(&(oscillator.len() as u64).to_le_bytes());
        for o in oscillator {
            hasher.update(o.date.to_string().as_bytes());
            hasher.update(&[u8::from(o.active)]);
        }

        hasher.update(b"params");
        hasher.update(&(params.slope_window as u64).to_le_bytes());
        hasher.update(&params.pos_threshold.to_le_bytes());
        hasher.update(&params.neg_threshold.to_le_bytes());
        hasher.update(params.mode.to_string().as_bytes());

        CacheKey(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct Entries<V> {
    values: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

/// Thread-safe cache holding at most `capacity` values. The oldest insertion
/// is evicted first. A capacity of 0 disables caching.
#[derive(Debug)]
pub struct ResultCache<V> {
    capacity: usize,
    inner: Mutex<Entries<V>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize) -> Self {
        ResultCache {
            capacity,
            inner: Mutex::new(Entries {
                values: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut inner = self.lock();
        match inner.values.get(key).cloned() {
            Some(v) => {
                inner.hits += 1;
                tracing::debug!(key = %key, "cache hit");
                Some(v)
            }
            None => {
                inner.misses += 1;
                tracing::debug!(key = %key, "cache miss");
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.lock();
        if inner.values.insert(key, value).is_some() {
            return;
        }
        inner.order.push_back(key);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.values.remove(&oldest);
            }
        }
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.values.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.values.len(),
        }
    }

    // A panic while holding the lock cannot leave the map half-updated in a
    // way that matters here, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Entries<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
