use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Duration;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::{CacheError, CacheStorage, Clock, SystemClock};
use crate::models::VaccineDetails;

/// Slot holding the JSON object of string id -> `VaccineDetails`, oldest first.
pub const CACHE_KEY: &str = "vaccine_cache";

/// Slot holding the store-wide write time as epoch milliseconds.
pub const CACHE_TIMESTAMP_KEY: &str = "vaccine_cache_timestamp";

/// Slot holding per-entry write times; only written under `FreshnessPolicy::PerEntry`.
pub const CACHE_ENTRY_TIMES_KEY: &str = "vaccine_cache_entry_times";

/// Detail snapshots older than this are treated as misses.
const DEFAULT_TTL_MINUTES: i64 = 30;

/// Maximum cached vaccines before the oldest insertions are evicted.
const DEFAULT_MAX_ENTRIES: usize = 50;

/// Largest serialized cache blob we try to persist (4 MiB).
const DEFAULT_BYTE_BUDGET: usize = 4 * 1024 * 1024;

/// Entries kept when the serialized blob exceeds the byte budget.
const DEFAULT_BUDGET_TRIM_ENTRIES: usize = 20;

/// How entry age is measured against the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessPolicy {
    /// One timestamp for the whole store, reset by every `put`. Writing any
    /// entry makes every other entry look fresh again.
    #[default]
    StoreWide,
    /// Each entry ages from its own insertion time.
    PerEntry,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: usize,
    pub byte_budget: usize,
    pub budget_trim_entries: usize,
    pub freshness: FreshnessPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            max_entries: DEFAULT_MAX_ENTRIES,
            byte_budget: DEFAULT_BYTE_BUDGET,
            budget_trim_entries: DEFAULT_BUDGET_TRIM_ENTRIES,
            freshness: FreshnessPolicy::StoreWide,
        }
    }
}

/// Snapshot of cache health for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub size: usize,
    /// Minutes since the store-wide timestamp, rounded.
    pub age_minutes: i64,
    pub is_expired: bool,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    details: VaccineDetails,
    inserted_ms: i64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<i64, CachedEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<i64>,
    /// Store-wide write time in epoch ms; 0 after `clear`.
    timestamp_ms: i64,
}

impl CacheState {
    fn insert(&mut self, id: i64, details: VaccineDetails, inserted_ms: i64) {
        // Overwrites keep their original slot in the insertion order
        if !self.entries.contains_key(&id) {
            self.order.push_back(id);
        }
        self.entries.insert(
            id,
            CachedEntry {
                details,
                inserted_ms,
            },
        );
    }

    /// Drop the oldest insertions until at most `keep` remain.
    fn retain_newest(&mut self, keep: usize) -> Vec<i64> {
        let mut evicted = Vec::new();
        while self.order.len() > keep {
            if let Some(id) = self.order.pop_front() {
                self.entries.remove(&id);
                evicted.push(id);
            }
        }
        evicted
    }
}

/// Serializes entries as a JSON object in insertion order.
struct OrderedEntries<'a>(&'a CacheState);

impl Serialize for OrderedEntries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let state = self.0;
        serializer.collect_map(state.order.iter().filter_map(|id| {
            state
                .entries
                .get(id)
                .map(|entry| (id.to_string(), &entry.details))
        }))
    }
}

/// Parsed entries in document order. Any non-integer key rejects the whole blob.
struct PersistedEntries(Vec<(i64, VaccineDetails)>);

impl<'de> Deserialize<'de> for PersistedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = PersistedEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping vaccine ids to details")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, details)) = map.next_entry::<String, VaccineDetails>()? {
                    let id = key
                        .parse::<i64>()
                        .map_err(|_| de::Error::custom(format!("invalid cache key: {}", key)))?;
                    entries.push((id, details));
                }
                Ok(PersistedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Bounded, time-expiring cache of assembled vaccine details.
///
/// Holds at most `max_entries` snapshots keyed by vaccine id, evicting the
/// oldest insertions first. Every mutation is written through to the
/// injected [`CacheStorage`], and the persisted state is loaded on
/// construction. Storage problems never surface: unreadable data starts the
/// cache empty and failed writes are logged.
pub struct VaccineCache {
    storage: Arc<dyn CacheStorage>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

impl VaccineCache {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        clock: Arc<dyn Clock>,
        settings: CacheSettings,
    ) -> Self {
        let state = match Self::read_persisted(storage.as_ref(), settings.freshness) {
            Ok(state) => {
                debug!(
                    size = state.order.len(),
                    timestamp_ms = state.timestamp_ms,
                    "Loaded vaccine cache"
                );
                state
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable vaccine cache");
                Self::remove_persisted(storage.as_ref());
                CacheState::default()
            }
        };

        Self {
            storage,
            clock,
            settings,
            state: Mutex::new(state),
        }
    }

    /// Cache with default settings and the system clock.
    pub fn with_storage(storage: Arc<dyn CacheStorage>) -> Self {
        Self::new(storage, Arc::new(SystemClock), CacheSettings::default())
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Fresh snapshot for `id`, or `None` on a miss or an expired entry.
    pub fn get(&self, id: i64) -> Option<VaccineDetails> {
        let state = self.lock();
        if self.is_fresh(&state, id) {
            debug!(id, "Vaccine cache hit");
            state.entries.get(&id).map(|entry| entry.details.clone())
        } else {
            debug!(id, present = state.entries.contains_key(&id), "Vaccine cache miss");
            None
        }
    }

    /// Same freshness test as [`get`](Self::get) without cloning the snapshot.
    pub fn has(&self, id: i64) -> bool {
        let state = self.lock();
        self.is_fresh(&state, id)
    }

    /// Insert or replace the snapshot for `id` and reset the store timestamp.
    pub fn put(&self, id: i64, details: VaccineDetails) {
        let now = self.now_ms();
        let mut state = self.lock();
        state.insert(id, details, now);
        state.timestamp_ms = now;

        let evicted = state.retain_newest(self.settings.max_entries);
        if !evicted.is_empty() {
            debug!(?evicted, "Evicted oldest vaccine cache entries");
        }

        self.persist(&mut state);
    }

    /// Empty the cache and reset the timestamp to the epoch.
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = CacheState::default();
        Self::remove_persisted(self.storage.as_ref());
        debug!("Vaccine cache cleared");
    }

    /// Clear only if the store-wide timestamp has expired. Returns whether it did.
    pub fn clear_expired(&self) -> bool {
        if self.status().is_expired {
            self.clear();
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.lock();
        let age_ms = self.now_ms() - state.timestamp_ms;
        CacheStatus {
            size: state.order.len(),
            age_minutes: (age_ms as f64 / 60_000.0).round() as i64,
            is_expired: age_ms >= self.settings.ttl.num_milliseconds(),
        }
    }

    /// Cached ids, oldest insertion first.
    pub fn ids(&self) -> Vec<i64> {
        self.lock().order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn is_fresh(&self, state: &CacheState, id: i64) -> bool {
        let Some(entry) = state.entries.get(&id) else {
            return false;
        };
        let written_ms = match self.settings.freshness {
            FreshnessPolicy::StoreWide => state.timestamp_ms,
            FreshnessPolicy::PerEntry => entry.inserted_ms,
        };
        self.now_ms() - written_ms < self.settings.ttl.num_milliseconds()
    }

    fn read_persisted(
        storage: &dyn CacheStorage,
        freshness: FreshnessPolicy,
    ) -> Result<CacheState, CacheError> {
        let mut state = CacheState::default();

        if let Some(raw) = storage.read(CACHE_TIMESTAMP_KEY)? {
            state.timestamp_ms = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| CacheError::Malformed(format!("invalid cache timestamp: {}", raw)))?;
        }

        let Some(blob) = storage.read(CACHE_KEY)? else {
            return Ok(state);
        };
        let PersistedEntries(entries) = serde_json::from_str(&blob)?;

        let entry_times: HashMap<String, i64> = match freshness {
            FreshnessPolicy::PerEntry => match storage.read(CACHE_ENTRY_TIMES_KEY)? {
                Some(raw) => serde_json::from_str(&raw)?,
                None => HashMap::new(),
            },
            FreshnessPolicy::StoreWide => HashMap::new(),
        };

        for (id, details) in entries {
            let inserted_ms = entry_times
                .get(&id.to_string())
                .copied()
                .unwrap_or(state.timestamp_ms);
            state.insert(id, details, inserted_ms);
        }
        Ok(state)
    }

    fn remove_persisted(storage: &dyn CacheStorage) {
        for key in [CACHE_KEY, CACHE_TIMESTAMP_KEY, CACHE_ENTRY_TIMES_KEY] {
            if let Err(e) = storage.remove(key) {
                warn!(slot = key, error = %e, "Failed to remove cache slot");
            }
        }
    }

    /// Write the state through to storage, absorbing every failure.
    fn persist(&self, state: &mut CacheState) {
        match self.try_persist(state) {
            Ok(()) => {}
            Err(CacheError::QuotaExceeded { needed, quota }) => {
                warn!(needed, quota, "Cache storage quota exceeded, clearing cache");
                *state = CacheState::default();
                Self::remove_persisted(self.storage.as_ref());
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist vaccine cache");
            }
        }
    }

    fn try_persist(&self, state: &mut CacheState) -> Result<(), CacheError> {
        if state.order.is_empty() {
            Self::remove_persisted(self.storage.as_ref());
            return Ok(());
        }

        let mut blob = serde_json::to_string(&OrderedEntries(state))?;
        if blob.len() > self.settings.byte_budget {
            warn!(
                bytes = blob.len(),
                budget = self.settings.byte_budget,
                keep = self.settings.budget_trim_entries,
                "Vaccine cache over byte budget, keeping newest entries"
            );
            state.retain_newest(self.settings.budget_trim_entries);
            blob = serde_json::to_string(&OrderedEntries(state))?;
            if blob.len() > self.settings.byte_budget {
                return Err(CacheError::QuotaExceeded {
                    needed: blob.len() as u64,
                    quota: self.settings.byte_budget as u64,
                });
            }
        }

        self.storage.write(CACHE_KEY, &blob)?;
        self.storage
            .write(CACHE_TIMESTAMP_KEY, &state.timestamp_ms.to_string())?;

        if self.settings.freshness == FreshnessPolicy::PerEntry {
            let times: HashMap<String, i64> = state
                .entries
                .iter()
                .map(|(id, entry)| (id.to_string(), entry.inserted_ms))
                .collect();
            self.storage
                .write(CACHE_ENTRY_TIMES_KEY, &serde_json::to_string(&times)?)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
