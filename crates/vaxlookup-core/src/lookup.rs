//! Read-only vaccine queries with classification, ordering, and caching.
//!
//! `LookupService` is what front ends call. It fetches from a [`DataSource`],
//! applies the name-derived category and display ordering, and serves
//! repeat detail lookups from the [`VaccineCache`].

use std::sync::Arc;

use futures::try_join;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::SourceError;
use crate::cache::VaccineCache;
use crate::models::{sort_summaries, VaccineDetails, VaccineStats, VaccineSummary};
use crate::source::DataSource;
use crate::utils::contains_ignore_case;

/// How many recently added vaccines the overview shows.
const RECENT_VACCINES_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Vaccine not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::NotFound(_) => false,
            LookupError::Source(e) => e.is_retryable(),
        }
    }
}

pub struct LookupService<S> {
    source: S,
    cache: Arc<VaccineCache>,
}

impl<S: DataSource> LookupService<S> {
    pub fn new(source: S, cache: Arc<VaccineCache>) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &VaccineCache {
        &self.cache
    }

    /// Every vaccine, categorized and sorted by category rank then name.
    /// Never cached.
    pub async fn list_all(&self) -> Result<Vec<VaccineSummary>, LookupError> {
        let mut summaries = self.source.fetch_summaries().await?;
        for summary in &mut summaries {
            summary.categorize();
        }
        sort_summaries(&mut summaries);
        debug!(count = summaries.len(), "Listed vaccines");
        Ok(summaries)
    }

    /// One vaccine with its trials and adverse effects.
    ///
    /// Served from the cache when fresh. Otherwise fetched, prepared, and
    /// cached; failed fetches leave the cache untouched.
    pub async fn get_by_id(&self, id: i64) -> Result<VaccineDetails, LookupError> {
        if let Some(mut details) = self.cache.get(id) {
            details.prepare();
            return Ok(details);
        }

        let mut details = self
            .source
            .fetch_details(id)
            .await?
            .ok_or(LookupError::NotFound(id))?;
        details.prepare();

        self.cache.put(id, details.clone());
        info!(id, name = %details.vaccine.name, "Fetched vaccine details");
        Ok(details)
    }

    /// Table totals and the most recently added vaccines. Both are fetched
    /// concurrently; if either fails the whole call fails.
    pub async fn get_stats(&self) -> Result<VaccineStats, LookupError> {
        let (counts, recent) = try_join!(
            self.source.fetch_counts(),
            self.source.fetch_recent(RECENT_VACCINES_LIMIT),
        )?;
        Ok(VaccineStats::new(counts, recent))
    }

    /// Vaccines whose name, manufacturer, or description contains `term`
    /// (case-insensitive). A blank term matches all.
    ///
    /// Hits keep `list_all` order (category rank, then name) rather than a
    /// plain alphabetical order, so results group the same way as the full
    /// list.
    pub async fn search(&self, term: &str) -> Result<Vec<VaccineSummary>, LookupError> {
        let needle = term.trim().to_lowercase();
        let mut summaries = self.list_all().await?;
        if !needle.is_empty() {
            summaries.retain(|s| {
                contains_ignore_case(&s.name, &needle)
                    || contains_ignore_case(&s.manufacturer, &needle)
                    || s.description
                        .as_deref()
                        .is_some_and(|d| contains_ignore_case(d, &needle))
            });
        }
        Ok(summaries)
    }

    /// Whether `get_by_id(id)` would be answered without the data source.
    pub fn is_cached(&self, id: i64) -> bool {
        self.cache.has(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use crate::cache::{CacheSettings, ManualClock, MemoryStorage};
    use crate::models::{AdverseEffect, RecentVaccine, Vaccine, VaccineCategory, VaccineCounts};

    #[derive(Default)]
    struct FakeSource {
        vaccines: Vec<Vaccine>,
        effects: Vec<AdverseEffect>,
        detail_calls: AtomicUsize,
        fail: AtomicBool,
        fail_counts: AtomicBool,
    }

    impl FakeSource {
        fn with_vaccines(names: &[(i64, &str)]) -> Self {
            Self {
                vaccines: names
                    .iter()
                    .map(|(id, name)| Vaccine {
                        id: *id,
                        name: name.to_string(),
                        manufacturer: "Acme".to_string(),
                        ..Vaccine::default()
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), SourceError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(SourceError::Server("database unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DataSource for FakeSource {
        async fn fetch_summaries(&self) -> Result<Vec<VaccineSummary>, SourceError> {
            self.check()?;
            Ok(self.vaccines.iter().map(VaccineSummary::from).collect())
        }

        async fn fetch_details(&self, id: i64) -> Result<Option<VaccineDetails>, SourceError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.vaccines.iter().find(|v| v.id == id).map(|v| VaccineDetails {
                vaccine: v.clone(),
                clinical_trials: Vec::new(),
                adverse_effects: self.effects.clone(),
            }))
        }

        async fn fetch_counts(&self) -> Result<VaccineCounts, SourceError> {
            self.check()?;
            if self.fail_counts.load(Ordering::SeqCst) {
                return Err(SourceError::Unauthorized);
            }
            Ok(VaccineCounts {
                vaccines: self.vaccines.len() as u64,
                clinical_trials: 4,
                adverse_effects: self.effects.len() as u64,
            })
        }

        async fn fetch_recent(&self, limit: usize) -> Result<Vec<RecentVaccine>, SourceError> {
            self.check()?;
            Ok(self
                .vaccines
                .iter()
                .rev()
                .take(limit)
                .map(|v| RecentVaccine {
                    name: v.name.clone(),
                    created_at: None,
                })
                .collect())
        }
    }

    struct Fixture {
        service: LookupService<FakeSource>,
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
    }

    fn fixture(source: FakeSource) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let cache = Arc::new(VaccineCache::new(
            storage.clone(),
            clock.clone(),
            CacheSettings::default(),
        ));
        Fixture {
            service: LookupService::new(source, cache),
            storage,
            clock,
        }
    }

    fn effect(name: &str, severity: &str) -> AdverseEffect {
        AdverseEffect {
            effect_name: name.to_string(),
            severity: Some(severity.to_string()),
            ..AdverseEffect::default()
        }
    }

    #[tokio::test]
    async fn test_list_all_categorized_and_ordered() {
        let f = fixture(FakeSource::with_vaccines(&[
            (1, "Z-Vax"),
            (2, "Fluzone"),
            (3, "Hep-B Shot"),
            (4, "Comirnaty COVID-19"),
            (5, "afluria"),
        ]));
        let list = f.service.list_all().await.unwrap();
        let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["Hep-B Shot", "Comirnaty COVID-19", "afluria", "Fluzone", "Z-Vax"]
        );
        assert_eq!(list[0].vaccine_type, VaccineCategory::HepatitisB);
        assert_eq!(list[4].vaccine_type, VaccineCategory::Other);
    }

    #[tokio::test]
    async fn test_get_by_id_caches_and_skips_source() {
        let mut source = FakeSource::with_vaccines(&[(7, "Gardasil 9")]);
        source.effects = vec![
            effect("Headache", "Mild"),
            effect("Anaphylaxis", "Severe"),
            effect("Fever", "Moderate"),
        ];
        let f = fixture(source);
        assert!(!f.service.is_cached(7));

        let first = f.service.get_by_id(7).await.unwrap();
        assert_eq!(first.vaccine.vaccine_type, VaccineCategory::Hpv);
        let severities: Vec<&str> = first
            .adverse_effects
            .iter()
            .map(|e| e.severity.as_deref().unwrap())
            .collect();
        assert_eq!(severities, ["Severe", "Moderate", "Mild"]);
        assert!(f.service.is_cached(7));

        let second = f.service.get_by_id(7).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(f.service.source().detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_is_recategorized() {
        let f = fixture(FakeSource::with_vaccines(&[(3, "Fluzone")]));
        // A snapshot written by an older build with a stale category
        let mut stale = f.service.source().fetch_details(3).await.unwrap().unwrap();
        stale.vaccine.vaccine_type = VaccineCategory::Rabies;
        f.service.cache().put(3, stale);

        let details = f.service.get_by_id(3).await.unwrap();
        assert_eq!(details.vaccine.vaccine_type, VaccineCategory::Influenza);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let f = fixture(FakeSource::with_vaccines(&[(1, "Varivax")]));
        f.service.get_by_id(1).await.unwrap();
        f.clock.advance(Duration::minutes(31));
        f.service.get_by_id(1).await.unwrap();
        assert_eq!(f.service.source().detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_distinct_from_failure() {
        let f = fixture(FakeSource::with_vaccines(&[(1, "Varivax")]));
        let err = f.service.get_by_id(999).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, LookupError::NotFound(999)));

        f.service.source().fail.store(true, Ordering::SeqCst);
        let err = f.service.get_by_id(1).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.is_retryable());
        assert!(matches!(err, LookupError::Source(SourceError::Server(_))));
    }

    #[tokio::test]
    async fn test_failures_never_touch_cache() {
        let f = fixture(FakeSource::with_vaccines(&[(1, "Varivax")]));
        f.service.source().fail.store(true, Ordering::SeqCst);
        assert!(f.service.get_by_id(1).await.is_err());
        assert!(f.service.get_by_id(999).await.is_err());
        assert!(f.service.cache().is_empty());
        assert!(f.storage.is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_survives_source_outage() {
        let f = fixture(FakeSource::with_vaccines(&[(1, "Varivax")]));
        f.service.get_by_id(1).await.unwrap();
        f.service.source().fail.store(true, Ordering::SeqCst);
        assert_eq!(f.service.get_by_id(1).await.unwrap().vaccine.name, "Varivax");
    }

    #[tokio::test]
    async fn test_get_stats() {
        let f = fixture(FakeSource::with_vaccines(&[
            (1, "A"),
            (2, "B"),
            (3, "C"),
            (4, "D"),
            (5, "E"),
            (6, "F"),
        ]));
        let stats = f.service.get_stats().await.unwrap();
        assert_eq!(stats.total_vaccines, 6);
        assert_eq!(stats.total_clinical_trials, 4);
        assert_eq!(stats.total_adverse_effects, 0);
        let names: Vec<&str> = stats.recently_added.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["F", "E", "D", "C", "B"]);
    }

    #[tokio::test]
    async fn test_stats_fail_as_a_whole() {
        let f = fixture(FakeSource::with_vaccines(&[(1, "A")]));
        f.service.source().fail_counts.store(true, Ordering::SeqCst);
        let err = f.service.get_stats().await.unwrap_err();
        assert!(matches!(err, LookupError::Source(SourceError::Unauthorized)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_search_results_grouped_by_category() {
        let f = fixture(FakeSource::with_vaccines(&[
            (1, "Acme Flu Booster"),
            (2, "Zeta Hepatitis B"),
            (3, "Acme Travel Shot"),
        ]));
        let hits = f.service.search("a").await.unwrap();
        let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Zeta Hepatitis B", "Acme Flu Booster", "Acme Travel Shot"]);
    }

    #[tokio::test]
    async fn test_search() {
        let mut source = FakeSource::with_vaccines(&[(1, "Fluzone"), (2, "Engerix-B"), (3, "Shingrix")]);
        source.vaccines[2].manufacturer = "GlaxoSmithKline".to_string();
        source.vaccines[1].description = Some("Recombinant hepatitis B vaccine".to_string());
        let f = fixture(source);

        let hits = f.service.search("FLU").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Fluzone");

        let hits = f.service.search("glaxo").await.unwrap();
        assert_eq!(hits[0].name, "Shingrix");

        let hits = f.service.search("recombinant").await.unwrap();
        assert_eq!(hits[0].name, "Engerix-B");

        assert_eq!(f.service.search("  ").await.unwrap().len(), 3);
        assert!(f.service.search("rabies").await.unwrap().is_empty());
    }
}
