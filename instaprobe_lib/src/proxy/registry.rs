//! Registry of client IPs seen by the service, used as rotation candidates.
//!
//! Entries expire once `last_seen_at` is older than the configured TTL, and the
//! registry holds at most `capacity` entries, evicting the least recently seen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use super::candidate::{PerformanceStats, Protocol, ProxyAddr, ProxyCandidate};

/// A client seen by the service.
#[derive(Debug, Clone, Serialize)]
pub struct UserIpEntry {
    pub ip: String,
    pub user_agent: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub use_count: u64,
    pub stats: PerformanceStats,
    #[serde(skip)]
    seq: u64,
    /// Bumped on every sighting; orders eviction.
    #[serde(skip)]
    seen_seq: u64,
}

impl UserIpEntry {
    /// Candidate view of this client, flagged `is_user_ip`.
    pub fn to_candidate(&self) -> ProxyCandidate {
        ProxyCandidate {
            address: ProxyAddr::host_only(self.ip.clone()),
            protocol: Protocol::Http,
            stats: self.stats.clone(),
            is_user_ip: true,
            added_seq: self.seq,
            added_at: self.first_seen_at,
        }
    }
}

pub struct UserIpRegistry {
    entries: DashMap<String, UserIpEntry>,
    ttl: chrono::Duration,
    capacity: usize,
    seq: AtomicU64,
    /// Serializes insert-with-eviction so the cap holds under concurrent inserts.
    admit: Mutex<()>,
}

impl UserIpRegistry {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::days(36_500)),
            capacity: capacity.max(1),
            seq: AtomicU64::new(0),
            admit: Mutex::new(()),
        }
    }

    fn is_expired(&self, entry: &UserIpEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.last_seen_at) > self.ttl
    }

    /// Records a sighting. Returns `true` when the IP was not yet registered.
    pub fn register(&self, ip: &str, user_agent: Option<&str>) -> bool {
        let now = Utc::now();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        if self.touch(ip, user_agent, now, seq) {
            return false;
        }

        let _guard = self.admit.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have admitted the same IP while we waited.
        if self.touch(ip, user_agent, now, seq) {
            return false;
        }
        self.entries.remove(ip);
        self.prune_expired();
        while self.entries.len() >= self.capacity {
            if !self.evict_least_recent() {
                break;
            }
        }
        self.entries.insert(
            ip.to_string(),
            UserIpEntry {
                ip: ip.to_string(),
                user_agent: user_agent.map(str::to_string),
                first_seen_at: now,
                last_seen_at: now,
                use_count: 1,
                stats: PerformanceStats::default(),
                seq,
                seen_seq: seq,
            },
        );
        tracing::debug!("Registered client IP {} as rotation candidate", ip);
        true
    }

    /// Bumps a live entry in place. Returns `false` when missing or expired.
    fn touch(&self, ip: &str, user_agent: Option<&str>, now: DateTime<Utc>, seq: u64) -> bool {
        match self.entries.get_mut(ip) {
            Some(mut entry) if !self.is_expired(&entry, now) => {
                entry.last_seen_at = now;
                entry.seen_seq = entry.seen_seq.max(seq);
                entry.use_count += 1;
                if let Some(ua) = user_agent {
                    entry.user_agent = Some(ua.to_string());
                }
                true
            }
            _ => false,
        }
    }

    /// Live entry for `ip`. Expired entries are removed on the way.
    pub fn get(&self, ip: &str) -> Option<UserIpEntry> {
        let entry = self.entries.get(ip)?.clone();
        if self.is_expired(&entry, Utc::now()) {
            self.entries.remove(ip);
            return None;
        }
        Some(entry)
    }

    pub fn candidate(&self, ip: &str) -> Option<ProxyCandidate> {
        self.get(ip).map(|entry| entry.to_candidate())
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.get(ip).is_some()
    }

    /// Records an outcome for a live registered IP. Returns `false` if unknown or expired.
    pub fn record(&self, ip: &str, success: bool, latency: Duration) -> bool {
        match self.entries.get_mut(ip) {
            Some(mut entry) if !self.is_expired(&entry, Utc::now()) => {
                entry.stats.record(success, latency);
                true
            }
            _ => false,
        }
    }

    /// Drops expired entries. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }

    fn evict_least_recent(&self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.seen_seq)
            .map(|entry| entry.key().clone());
        match victim {
            Some(ip) => {
                tracing::debug!("Evicting client IP {} (registry full)", ip);
                self.entries.remove(&ip).is_some()
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<UserIpEntry> {
        self.entries.iter().map(|entry| entry.clone()).collect()
    }
}
