//! Aggregate statistics for the overview page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::de;

/// Row counts per table, fetched together so a failed count never reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaccineCounts {
    pub vaccines: u64,
    pub clinical_trials: u64,
    pub adverse_effects: u64,
}

/// A recently added vaccine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecentVaccine {
    pub name: String,
    #[serde(default, deserialize_with = "de::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct VaccineStats {
    #[serde(rename = "totalVaccines")]
    pub total_vaccines: u64,
    #[serde(rename = "totalClinicalTrials")]
    pub total_clinical_trials: u64,
    #[serde(rename = "totalAdverseEffects")]
    pub total_adverse_effects: u64,
    #[serde(rename = "recentlyAdded")]
    pub recently_added: Vec<RecentVaccine>,
}

impl VaccineStats {
    pub fn new(counts: VaccineCounts, recently_added: Vec<RecentVaccine>) -> Self {
        Self {
            total_vaccines: counts.vaccines,
            total_clinical_trials: counts.clinical_trials,
            total_adverse_effects: counts.adverse_effects,
            recently_added,
        }
    }
}
