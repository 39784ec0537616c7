//! Core library for vaxlookup.
//!
//! Vaccine records are read from a [`DataSource`] (a PostgREST service or a
//! JSON export), categorized by name, ordered for display, and detail
//! lookups are cached on disk for a short time.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaxlookup_core::{FileStorage, LookupService, RestClient, VaccineCache};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let storage = FileStorage::new("/tmp/vaxlookup".into())?;
//! let cache = Arc::new(VaccineCache::with_storage(Arc::new(storage)));
//! let client = RestClient::new("https://example.supabase.co", Some("anon-key"))?;
//! let service = LookupService::new(client, cache);
//!
//! for vaccine in service.list_all().await? {
//!     println!("{} ({})", vaccine.name, vaccine.vaccine_type);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod lookup;
pub mod models;
pub mod source;
pub mod utils;

pub use api::{RestClient, SourceError};
pub use cache::{
    CacheError, CacheSettings, CacheStatus, CacheStorage, Clock, FileStorage, FreshnessPolicy,
    ManualClock, MemoryStorage, SystemClock, VaccineCache,
};
pub use config::Config;
pub use lookup::{LookupError, LookupService};
pub use models::{
    classify, rank_of_label, severity_rank, AdverseEffect, ClinicalTrial, RecentVaccine,
    Severity, Vaccine, VaccineCategory, VaccineCounts, VaccineDetails, VaccineStats,
    VaccineSummary,
};
pub use source::{DataSource, SnapshotSource};
