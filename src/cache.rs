//! Resolution Cache
//!
//! Two TTL tiers in front of the mirror: positive (resolved records) and
//! negative (confirmed absences). Both tiers share one map slot per name,
//! so a name can never be cached positive and negative at the same time;
//! writing one tier replaces the other.
//!
//! Expiry is passive (checked on read). `purge_expired` is an optional
//! sweep. There is no size bound.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::identifier;
use crate::types::DomainRecord;

/// Cached state for one name
#[derive(Debug, Clone)]
enum CacheEntry {
    Positive { record: DomainRecord, expires_at: Instant },
    Negative { expires_at: Instant },
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        let expires_at = match self {
            CacheEntry::Positive { expires_at, .. } => *expires_at,
            CacheEntry::Negative { expires_at } => *expires_at,
        };
        now >= expires_at
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Confirmed absent (negative tier)
    Absent,

    /// Resolved record (positive tier)
    Hit(DomainRecord),

    /// Nothing cached
    Miss,
}

/// Entry counts per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub positive: usize,
    pub negative: usize,
}

/// Two-tier TTL cache, shared by the resolver and reconciliation
pub struct ResolutionCache {
    entries: DashMap<String, CacheEntry>,
    positive_ttl: Duration,
    negative_ttl: Duration,
}

impl ResolutionCache {
    /// Create a cache with independent TTLs per tier
    pub fn new(positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            positive_ttl,
            negative_ttl,
        }
    }

    /// Look up a name: negative tier first, then positive
    pub fn lookup(&self, name: &str) -> CacheLookup {
        let key = identifier::normalize_name(name);
        let now = Instant::now();

        match self.entries.entry(key) {
            Entry::Occupied(occupied) if occupied.get().is_expired(now) => {
                occupied.remove();
                CacheLookup::Miss
            }
            Entry::Occupied(occupied) => match occupied.get() {
                CacheEntry::Negative { .. } => CacheLookup::Absent,
                CacheEntry::Positive { record, .. } => CacheLookup::Hit(record.clone()),
            },
            Entry::Vacant(_) => CacheLookup::Miss,
        }
    }

    /// Cache a resolved record, replacing any negative entry
    pub fn insert_positive(&self, record: DomainRecord) {
        let expires_at = Instant::now() + self.positive_ttl;
        self.entries
            .insert(record.name.clone(), CacheEntry::Positive { record, expires_at });
    }

    /// Cache a confirmed absence, replacing any positive entry
    pub fn insert_negative(&self, name: &str) {
        let expires_at = Instant::now() + self.negative_ttl;
        self.entries
            .insert(identifier::normalize_name(name), CacheEntry::Negative { expires_at });
    }

    /// Replace a live positive entry with a newer record.
    ///
    /// Names that are uncached, negative, or expired are left alone.
    /// Returns whether an entry was refreshed.
    pub fn refresh_if_cached(&self, record: &DomainRecord) -> bool {
        let now = Instant::now();

        match self.entries.get_mut(&record.name) {
            Some(mut entry) if !entry.is_expired(now) => match entry.value_mut() {
                CacheEntry::Positive { record: cached, expires_at } => {
                    *cached = record.clone();
                    *expires_at = now + self.positive_ttl;
                    true
                }
                CacheEntry::Negative { .. } => false,
            },
            _ => false,
        }
    }

    /// Whether a name is in the positive tier
    pub fn is_positive(&self, name: &str) -> bool {
        matches!(self.lookup(name), CacheLookup::Hit(_))
    }

    /// Whether a name is in the negative tier
    pub fn is_negative(&self, name: &str) -> bool {
        matches!(self.lookup(name), CacheLookup::Absent)
    }

    /// Remove all expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Entry counts per tier (expired entries included until read or swept)
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.entries.iter() {
            match entry.value() {
                CacheEntry::Positive { .. } => stats.positive += 1,
                CacheEntry::Negative { .. } => stats.negative += 1,
            }
        }
        stats
    }
}
