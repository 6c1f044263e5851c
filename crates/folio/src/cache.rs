//! TTL cache of chunked filings with single-flight population.
//!
//! Each key owns an async `RwLock` slot. Readers of a fresh entry share the
//! read lock; a miss takes the write lock, re-checks, and computes while
//! holding it, so concurrent requests for the same filing wait for one
//! computation instead of starting their own. Different keys never contend
//! beyond the short synchronous map lookup.

use crate::chunk::ChunkSet;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;

/// Tracing target for cache events.
pub const TRACING_TARGET: &str = "folio::cache";

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Identity of one filing's chunk set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Zero-padded company CIK
    pub cik: String,
    /// Form type
    pub form: String,
    /// Accession number without dashes
    pub accession: String,
}

impl CacheKey {
    /// Create a key.
    pub fn new(
        cik: impl Into<String>,
        form: impl Into<String>,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            cik: cik.into(),
            form: form.into(),
            accession: accession.into(),
        }
    }

    /// Key for a selected filing.
    pub fn for_filing(filing: &folio_data::edgar::FilingRecord) -> Self {
        Self::new(&filing.cik, filing.form.as_str(), &filing.accession)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cik, self.form, self.accession)
    }
}

/// A stored chunk set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The chunks
    pub chunks: ChunkSet,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
    /// How long the entry stays fresh
    pub ttl: Duration,
}

impl CacheEntry {
    /// Whether the entry is still usable at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match TimeDelta::from_std(self.ttl) {
            Ok(ttl) => now - self.created_at < ttl,
            Err(_) => true,
        }
    }
}

/// How a lookup was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// Fresh entry reused
    Hit,
    /// No entry; computed
    Miss,
    /// Stale entry replaced
    Expired,
}

type Slot = Arc<RwLock<Option<CacheEntry>>>;

/// In-memory cache of chunk sets keyed by `(cik, form, accession)`.
pub struct FilingCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for FilingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilingCache")
            .field("slots", &self.slot_count())
            .field("default_ttl", &self.default_ttl)
            .field("clock", &self.clock)
            .finish()
    }
}

impl FilingCache {
    /// Create a cache on the wall clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Create a cache on an arbitrary clock.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    /// TTL used by [`put`](Self::put) when none is given.
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        self.map().entry(key.clone()).or_default().clone()
    }

    fn existing_slot(&self, key: &CacheKey) -> Option<Slot> {
        self.map().get(key).cloned()
    }

    /// Number of keys holding a slot, including empty and in-flight ones.
    pub fn slot_count(&self) -> usize {
        self.map().len()
    }

    /// Remove the slot for `key` unless another caller holds it.
    fn release_idle(&self, key: &CacheKey, slot: &Slot) {
        let mut map = self.map();
        let idle = map
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if idle {
            map.remove(key);
        }
    }

    /// Fresh chunks for `key`, if any.
    pub async fn get(&self, key: &CacheKey) -> Option<ChunkSet> {
        let slot = self.existing_slot(key)?;
        let guard = slot.read().await;
        let now = self.clock.now();
        guard
            .as_ref()
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.chunks.clone())
    }

    /// Store chunks, replacing any entry; `None` uses the default TTL.
    pub async fn put(&self, key: &CacheKey, chunks: ChunkSet, ttl: Option<Duration>) {
        let slot = self.slot(key);
        let mut guard = slot.write().await;
        *guard = Some(CacheEntry {
            chunks,
            created_at: self.clock.now(),
            ttl: ttl.unwrap_or(self.default_ttl),
        });
    }

    /// Fresh chunks for `key`, computing and storing them on a miss.
    ///
    /// Concurrent callers for the same key wait for a single `compute`.
    /// Nothing is stored when `compute` fails or is cancelled. Every miss
    /// first purges expired entries of other keys.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<(ChunkSet, CacheLookup), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ChunkSet, E>>,
    {
        let slot = self.slot(key);

        {
            let guard = slot.read().await;
            if let Some(entry) = guard.as_ref() {
                if entry.is_fresh(self.clock.now()) {
                    tracing::debug!(target: TRACING_TARGET, key = %key, "Cache hit");
                    return Ok((entry.chunks.clone(), CacheLookup::Hit));
                }
            }
        }

        let mut guard = slot.write().await;
        let lookup = match guard.as_ref() {
            Some(entry) if entry.is_fresh(self.clock.now()) => {
                tracing::debug!(target: TRACING_TARGET, key = %key, "Cache hit after wait");
                return Ok((entry.chunks.clone(), CacheLookup::Hit));
            }
            Some(_) => CacheLookup::Expired,
            None => CacheLookup::Miss,
        };
        tracing::debug!(target: TRACING_TARGET, key = %key, lookup = ?lookup, "Computing chunks");

        let purged = self.purge_expired();
        if purged > 0 {
            tracing::debug!(target: TRACING_TARGET, purged, "Purged expired entries");
        }

        let chunks = match compute().await {
            Ok(chunks) => chunks,
            Err(err) => {
                guard.take();
                self.release_idle(key, &slot);
                return Err(err);
            }
        };
        *guard = Some(CacheEntry {
            chunks: chunks.clone(),
            created_at: self.clock.now(),
            ttl,
        });
        Ok((chunks, lookup))
    }

    /// Drop the entry for `key`; returns whether one was stored.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        match self.existing_slot(key) {
            Some(slot) => slot.write().await.take().is_some(),
            None => false,
        }
    }

    /// Drop every entry.
    ///
    /// Waits for in-flight computations, so none of them runs alongside a
    /// computation started after the clear.
    pub async fn clear(&self) {
        let slots: Vec<(CacheKey, Slot)> = self
            .map()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        for (key, slot) in slots {
            slot.write().await.take();
            self.release_idle(&key, &slot);
        }
    }

    /// Remove expired and empty slots; returns the number of expired
    /// entries removed. Slots another caller holds are left alone.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.map().retain(|key, slot| match slot.try_read() {
            Ok(guard) => match guard.as_ref() {
                Some(entry) if entry.is_fresh(now) => true,
                Some(_) if Arc::strong_count(slot) > 1 => true,
                Some(_) => {
                    tracing::debug!(target: TRACING_TARGET, key = %key, "Purged expired entry");
                    removed += 1;
                    false
                }
                None => Arc::strong_count(slot) > 1,
            },
            Err(_) => true,
        });
        removed
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self.map().values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.read().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Whether no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
