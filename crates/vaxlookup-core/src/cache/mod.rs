//! Persisted cache of assembled vaccine details.
//!
//! `VaccineCache` keeps recently viewed vaccines so repeat lookups skip the
//! data source. It writes through to a `CacheStorage` backend and uses an
//! injected `Clock` so expiry can be tested without sleeping.

pub mod clock;
mod error;
pub mod manager;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use manager::{
    CacheSettings, CacheStatus, FreshnessPolicy, VaccineCache, CACHE_ENTRY_TIMES_KEY, CACHE_KEY,
    CACHE_TIMESTAMP_KEY,
};
pub use storage::{CacheStorage, FileStorage, MemoryStorage};
