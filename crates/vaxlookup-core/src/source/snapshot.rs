//! In-memory data source backed by a JSON export of the database.
//!
//! Accepts either one document `{ "vaccines": [...], "clinical_trials": [...],
//! "adverse_effects": [...] }` or a directory holding the three per-table
//! export files. Child rows are joined to vaccines through `vaccine_id`.

use std::cmp::Ordering;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::DataSource;
use crate::api::SourceError;
use crate::models::{
    AdverseEffect, ClinicalTrial, RecentVaccine, Vaccine, VaccineCounts, VaccineDetails,
    VaccineSummary,
};

/// Per-table export file names.
const VACCINES_FILE: &str = "vaccines-export.json";
const TRIALS_FILE: &str = "clinical-trials-export.json";
const EFFECTS_FILE: &str = "adverse-effects-export.json";

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    vaccines: Vec<Vaccine>,
    #[serde(default)]
    clinical_trials: Vec<ClinicalTrial>,
    #[serde(default)]
    adverse_effects: Vec<AdverseEffect>,
}

#[derive(Debug, Default)]
pub struct SnapshotSource {
    vaccines: Vec<Vaccine>,
    clinical_trials: Vec<ClinicalTrial>,
    adverse_effects: Vec<AdverseEffect>,
}

impl SnapshotSource {
    pub fn new(
        vaccines: Vec<Vaccine>,
        clinical_trials: Vec<ClinicalTrial>,
        adverse_effects: Vec<AdverseEffect>,
    ) -> Self {
        let orphans = clinical_trials
            .iter()
            .filter_map(|t| t.vaccine_id)
            .chain(adverse_effects.iter().filter_map(|e| e.vaccine_id))
            .filter(|id| !vaccines.iter().any(|v| v.id == *id))
            .count();
        if orphans > 0 {
            warn!(orphans, "Snapshot has child rows for unknown vaccines");
        }

        Self {
            vaccines,
            clinical_trials,
            adverse_effects,
        }
    }

    /// Parse a combined snapshot document.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| SourceError::InvalidResponse(format!("Invalid snapshot: {}", e)))?;
        Ok(Self::new(
            snapshot.vaccines,
            snapshot.clinical_trials,
            snapshot.adverse_effects,
        ))
    }

    /// Load a combined snapshot file, or the three export files if `path` is
    /// a directory.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let source = if path.is_dir() {
            Self::new(
                read_table(&path.join(VACCINES_FILE))?,
                read_table(&path.join(TRIALS_FILE))?,
                read_table(&path.join(EFFECTS_FILE))?,
            )
        } else {
            Self::from_json(&std::fs::read_to_string(path)?)?
        };
        debug!(
            path = %path.display(),
            vaccines = source.vaccines.len(),
            clinical_trials = source.clinical_trials.len(),
            adverse_effects = source.adverse_effects.len(),
            "Loaded vaccine snapshot"
        );
        Ok(source)
    }
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        SourceError::InvalidResponse(format!("Invalid export file {}: {}", path.display(), e))
    })
}

/// Newest first; rows without a creation time go last.
fn cmp_newest_first(a: &Vaccine, b: &Vaccine) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl DataSource for SnapshotSource {
    async fn fetch_summaries(&self) -> Result<Vec<VaccineSummary>, SourceError> {
        Ok(self.vaccines.iter().map(VaccineSummary::from).collect())
    }

    async fn fetch_details(&self, id: i64) -> Result<Option<VaccineDetails>, SourceError> {
        let Some(vaccine) = self.vaccines.iter().find(|v| v.id == id) else {
            return Ok(None);
        };

        Ok(Some(VaccineDetails {
            vaccine: vaccine.clone(),
            clinical_trials: self
                .clinical_trials
                .iter()
                .filter(|t| t.vaccine_id == Some(id))
                .cloned()
                .collect(),
            adverse_effects: self
                .adverse_effects
                .iter()
                .filter(|e| e.vaccine_id == Some(id))
                .cloned()
                .collect(),
        }))
    }

    async fn fetch_counts(&self) -> Result<VaccineCounts, SourceError> {
        Ok(VaccineCounts {
            vaccines: self.vaccines.len() as u64,
            clinical_trials: self.clinical_trials.len() as u64,
            adverse_effects: self.adverse_effects.len() as u64,
        })
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RecentVaccine>, SourceError> {
        let mut newest: Vec<&Vaccine> = self.vaccines.iter().collect();
        newest.sort_by(|a, b| cmp_newest_first(a, b));
        Ok(newest
            .into_iter()
            .take(limit)
            .map(|v| RecentVaccine {
                name: v.name.clone(),
                created_at: v.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "vaccines": [
            {"id": 1, "name": "Engerix-B", "manufacturer": "GSK",
             "fda_approved_date": "1989-07-28T04:00:00.000Z",
             "created_at": "2024-01-01T00:00:00.000Z"},
            {"id": 2, "name": "Fluzone", "manufacturer": "Sanofi",
             "created_at": "2024-03-01T00:00:00.000Z"},
            {"id": 3, "name": "Imovax Rabies", "manufacturer": "Sanofi"}
        ],
        "clinical_trials": [
            {"id": 10, "vaccine_id": 1, "trial_phase": "Phase 3", "participant_count": "1200"},
            {"id": 11, "vaccine_id": 2, "trial_phase": "Phase 2"},
            {"id": 12, "vaccine_id": 1, "trial_phase": "Phase 4"}
        ],
        "adverse_effects": [
            {"id": 20, "vaccine_id": 1, "effect_name": "Soreness", "severity": "local",
             "occurrence_rate": "22.0000", "created_at": "2024-01-01T00:00:00.000Z"}
        ]
    }"#;

    #[tokio::test]
    async fn test_details_join_children_in_source_order() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let details = source.fetch_details(1).await.unwrap().unwrap();
        assert_eq!(details.vaccine.name, "Engerix-B");
        let trial_ids: Vec<i64> = details.clinical_trials.iter().map(|t| t.id).collect();
        assert_eq!(trial_ids, vec![10, 12]);
        assert_eq!(details.clinical_trials[0].participant_count, Some(1200));
        assert_eq!(details.adverse_effects.len(), 1);
        assert_eq!(details.adverse_effects[0].occurrence_rate, Some(22.0));
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        assert!(source.fetch_details(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counts_and_recent() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let counts = source.fetch_counts().await.unwrap();
        assert_eq!(
            counts,
            VaccineCounts {
                vaccines: 3,
                clinical_trials: 3,
                adverse_effects: 1
            }
        );

        let recent = source.fetch_recent(5).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Fluzone", "Engerix-B", "Imovax Rabies"]);

        let recent = source.fetch_recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn test_load_export_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(VACCINES_FILE),
            r#"[{"id": 5, "name": "Gardasil 9", "manufacturer": "Merck"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(TRIALS_FILE), "[]").unwrap();
        std::fs::write(
            dir.path().join(EFFECTS_FILE),
            r#"[{"id": 1, "vaccine_id": 5, "effect_name": "Fainting", "severity": null}]"#,
        )
        .unwrap();

        let source = SnapshotSource::load(dir.path()).unwrap();
        let summaries = source.fetch_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].manufacturer, "Merck");
        let details = source.fetch_details(5).await.unwrap().unwrap();
        assert_eq!(details.adverse_effects[0].effect_name, "Fainting");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SnapshotSource::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let err = SnapshotSource::from_json(r#"{"vaccines": 3}"#).unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
    }
}
