//! In-memory TTL cache with a capacity bound and least-recently-used eviction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A single cached value with its expiration time.
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    /// Recency tick; the smallest tick is evicted first.
    last_access: u64,
}

struct CacheState<V> {
    store: HashMap<String, CacheEntry<V>>,
    tick: u64,
}

impl<V> CacheState<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn purge_expired(&mut self, now: Instant) {
        self.store.retain(|_, entry| entry.expires_at > now);
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .store
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.store.remove(&key);
        }
    }
}

/// Thread-safe cache with time-to-live expiration and a fixed capacity.
///
/// Expired entries are lazily evicted on `get`, and purged before any
/// capacity eviction. Every operation takes the single internal lock, so
/// insert-and-evict is atomic with respect to concurrent callers.
pub struct MemoryCache<V> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone> MemoryCache<V> {
    /// Creates a cache holding at most `capacity` entries (minimum 1), each living `ttl`.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                store: HashMap::new(),
                tick: 0,
            }),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Returns the cached value for `key`, or `None` if missing or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let expired = state.store.get(key)?.expires_at <= now;
        if expired {
            state.store.remove(key);
            return None;
        }
        let tick = state.next_tick();
        let entry = state.store.get_mut(key)?;
        entry.last_access = tick;
        Some(entry.value.clone())
    }

    /// Age of a live entry.
    pub fn age(&self, key: &str) -> Option<Duration> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .store
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.created_at.elapsed())
    }

    /// Inserts or overwrites an entry. The entry expires after the configured TTL.
    pub fn set(&self, key: String, value: V) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if !state.store.contains_key(&key) && state.store.len() >= self.capacity {
            state.purge_expired(now);
            while state.store.len() >= self.capacity {
                state.evict_lru();
            }
        }
        let tick = state.next_tick();
        state.store.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + self.ttl,
                last_access: tick,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.store.remove(key).map(|entry| entry.value)
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .store
            .clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .store
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
