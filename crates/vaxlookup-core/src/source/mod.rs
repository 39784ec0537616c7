//! Where vaccine records come from.
//!
//! `LookupService` reads through the `DataSource` trait. Two sources ship
//! with the crate: `RestClient` talks to a PostgREST endpoint, and
//! `SnapshotSource` serves a JSON export from memory.

pub mod snapshot;

use async_trait::async_trait;

use crate::api::SourceError;
use crate::models::{RecentVaccine, VaccineCounts, VaccineDetails, VaccineSummary};

pub use snapshot::SnapshotSource;

/// Read-only access to the vaccine store.
///
/// Rows come back as stored: implementations do not categorize or sort.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Every vaccine's list projection, in any order.
    async fn fetch_summaries(&self) -> Result<Vec<VaccineSummary>, SourceError>;

    /// One vaccine with its trials and adverse effects, or `None` if no
    /// vaccine has this id.
    async fn fetch_details(&self, id: i64) -> Result<Option<VaccineDetails>, SourceError>;

    /// Row counts of the vaccines, clinical trials, and adverse effects tables.
    async fn fetch_counts(&self) -> Result<VaccineCounts, SourceError>;

    /// The `limit` most recently created vaccines, newest first.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RecentVaccine>, SourceError>;
}
