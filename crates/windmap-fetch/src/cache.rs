//! TTL response cache

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Full identity of one provider query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Source, entity and statistic field, e.g. `statistics:sensor.wind:max`
    pub query: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub offset: i64,
}

#[derive(Debug)]
struct Entry<V> {
    stored: Instant,
    value: V,
}

/// Responses kept for a fixed time; expiry is checked on lookup and insert
#[derive(Debug)]
pub struct ResponseCache<V> {
    ttl: Duration,
    entries: HashMap<CacheKey, Entry<V>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Lookup as of `now`; an expired entry is evicted
    pub fn get_at(&mut self, key: &CacheKey, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.stored) < self.ttl => {
                return Some(entry.value.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Store as of `now`, dropping whatever has expired by then
    pub fn insert_at(&mut self, key: CacheKey, value: V, now: Instant) {
        self.purge_expired(now);
        self.entries.insert(key, Entry { stored: now, value });
    }

    /// Drop every expired entry
    pub fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
