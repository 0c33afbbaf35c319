use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use fxhash::{FxHashMap, FxHasher64};
use jiff::{SignedDuration, civil::DateTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::{
    distance_request::DistanceRequest, distance_result::DistanceResult,
    transportation_mode::TransportationMode,
};

pub const DEFAULT_CACHE_TTL: SignedDuration = SignedDuration::from_hours(24);

/// Entries never live longer than this, whatever TTL they are written with.
pub const MAX_CACHE_TTL: SignedDuration = SignedDuration::from_hours(24 * 365 * 10);

/// 5 decimal places is roughly 1.1m at the equator.
pub const DEFAULT_COORDINATE_PRECISION: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl: SignedDuration,
    pub coordinate_precision: u8,
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            max_entries: None,
        }
    }
}

/// Normalized (origin, destination, mode) identity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    origin: (i64, i64),
    destination: (i64, i64),
    mode: TransportationMode,
    departure: Option<DateTime>,
}

impl CacheKey {
    pub fn new(request: &DistanceRequest, precision: u8) -> Self {
        Self {
            origin: request.origin.normalized(precision),
            destination: request.destination.normalized(precision),
            mode: request.mode,
            departure: request.departure,
        }
    }

    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher64::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.fingerprint())
    }
}

struct CacheEntry {
    value: DistanceResult,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// TTL-bounded store of computed distances, shared between concurrent tasks.
pub struct DistanceCache {
    config: CacheConfig,
    entries: Mutex<FxHashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl Default for DistanceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl DistanceCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn key_for(&self, request: &DistanceRequest) -> CacheKey {
        CacheKey::new(request, self.config.coordinate_precision)
    }

    pub fn get(&self, key: &CacheKey) -> Option<DistanceResult> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let value = match entries.get(key) {
            Some(entry) if entry.is_valid(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => None,
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("DistanceCache: hit {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("DistanceCache: miss {}", key);
        }

        value
    }

    pub fn put(&self, key: CacheKey, value: DistanceResult, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_CACHE_TTL.unsigned_abs()))
            .unwrap_or(now);
        let mut entries = self.entries.lock();

        if let Some(max_entries) = self.config.max_entries
            && entries.len() >= max_entries
            && !entries.contains_key(&key)
        {
            self.make_room(&mut entries, now, max_entries);
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// `put` with the configured TTL.
    pub fn insert(&self, key: CacheKey, value: DistanceResult) {
        self.put(key, value, self.config.ttl.unsigned_abs());
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drops logically expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let removed = Self::remove_expired(&mut entries, now);
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn remove_expired(entries: &mut FxHashMap<CacheKey, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        before - entries.len()
    }

    fn make_room(
        &self,
        entries: &mut FxHashMap<CacheKey, CacheEntry>,
        now: Instant,
        max_entries: usize,
    ) {
        let mut removed = Self::remove_expired(entries, now);

        while entries.len() >= max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| *key)
            else {
                break;
            };
            entries.remove(&oldest);
            removed += 1;
        }

        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
    }
}
