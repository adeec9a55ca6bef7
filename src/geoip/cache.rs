//! In-memory TTL cache.
//!
//! Entries expire a fixed duration after they were stored. There is no
//! background sweep: an expired entry is dropped the next time it is read.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Source of the current time for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// A cached value and the instant it stops being visible.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

/// Thread-safe cache whose entries expire `ttl` after being set.
///
/// # Example
///
/// ```
/// use sitegate::geoip::TtlCache;
/// use std::time::Duration;
///
/// let cache = TtlCache::new(Duration::from_secs(60)).unwrap();
/// cache.set("203.0.113.7", "DE".to_string());
/// assert_eq!(cache.get("203.0.113.7").as_deref(), Some("DE"));
/// ```
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<AHashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache using the system clock.
    ///
    /// Fails when `ttl` is zero.
    pub fn new(ttl: Duration) -> Result<Self> {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache with a custom clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if ttl.is_zero() {
            return Err(Error::Config("cache TTL must be positive".to_string()));
        }
        Ok(Self {
            ttl,
            entries: Mutex::new(AHashMap::new()),
            clock,
        })
    }

    /// Get a live entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value, restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries
            .lock()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
