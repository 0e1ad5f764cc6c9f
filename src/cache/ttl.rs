//! In-memory TTL cache
//!
//! Entries expire lazily: `get` treats anything past its deadline as absent whether
//! or not a sweep has removed it yet. An optional background task purges expired
//! entries to bound memory.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Shortest sweep period; a zero period is raised to this
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// A cached value with its deadline
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL overflows the clock; such entries never expire
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Thread-safe string-keyed cache with per-entry expiry
///
/// Each operation takes the internal lock once, so readers never observe a
/// partially written value. Values are cloned out on `get`; wrap large values in
/// an `Arc` to keep that cheap.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    standard_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache whose `set` calls without a TTL use `standard_ttl`
    pub fn new(standard_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            standard_ttl,
        }
    }

    /// Creates a cache from the `[cache]` configuration section
    pub fn from_config(config: &crate::config::CacheConfig) -> Self {
        Self::new(config.standard_ttl())
    }

    pub fn standard_ttl(&self) -> Duration {
        self.standard_ttl
    }

    /// Returns the value for `key` if present and not expired
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_crawl::cache::TtlCache;
    /// use std::time::Duration;
    ///
    /// let cache = TtlCache::new(Duration::from_secs(600));
    /// cache.set("listing:123", 42u32, None);
    /// assert_eq!(cache.get("listing:123"), Some(42));
    /// assert_eq!(cache.get("listing:456"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                tracing::debug!("cache hit: {}", key);
                Some(entry.value.clone())
            }
            _ => {
                tracing::debug!("cache miss: {}", key);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any existing entry and its TTL
    ///
    /// `ttl` defaults to the cache's standard TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.standard_ttl);
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };

        tracing::debug!("cache set: {} (ttl={:?})", key, ttl);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    /// Removes `key`; does nothing if it is absent
    pub fn del(&self, key: &str) {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some();
        if removed {
            tracing::debug!("cache del: {}", key);
        }
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::debug!("cache cleared");
    }

    /// Number of entries that have not expired
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically removes expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Spawns a task that purges expired entries every `period`
    ///
    /// The task holds only a weak reference and stops once the cache is dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let period = period.max(MIN_SWEEP_PERIOD);
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!("cache sweep removed {} expired entries", purged);
                }
            }
        })
    }
}
