//! Vaccine, clinical trial, and adverse effect records.
//!
//! Field names follow the database columns so rows deserialize directly from
//! the REST source and from JSON exports. The category (`vaccine_type`) is
//! derived from the name and never read back from any serialized form.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::category::{classify, VaccineCategory};
use super::de;
use super::severity::{sort_adverse_effects, Severity};
use crate::utils::cmp_ignore_case;

/// Full vaccine record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Vaccine {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "de::string_or_null")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub fda_approved_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub childhood_schedule_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fda_url: Option<String>,
    #[serde(default, deserialize_with = "de::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Derived from `name`; see [`Vaccine::categorize`].
    #[serde(default, skip_deserializing)]
    pub vaccine_type: VaccineCategory,
}

impl Vaccine {
    /// Recompute the derived category from the current name.
    pub fn categorize(&mut self) {
        self.vaccine_type = classify(&self.name);
    }
}

/// List projection of a vaccine, as shown in the vaccine picker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct VaccineSummary {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "de::string_or_null")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub fda_approved_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub childhood_schedule_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_deserializing)]
    pub vaccine_type: VaccineCategory,
}

impl VaccineSummary {
    pub fn categorize(&mut self) {
        self.vaccine_type = classify(&self.name);
    }
}

impl From<&Vaccine> for VaccineSummary {
    fn from(v: &Vaccine) -> Self {
        Self {
            id: v.id,
            name: v.name.clone(),
            manufacturer: v.manufacturer.clone(),
            fda_approved_date: v.fda_approved_date,
            childhood_schedule_date: v.childhood_schedule_date,
            description: v.description.clone(),
            vaccine_type: v.vaccine_type,
        }
    }
}

/// Sort summaries by category rank, then case-insensitively by name.
///
/// Uses the `vaccine_type` already on each summary; call
/// [`VaccineSummary::categorize`] first for freshly fetched rows.
pub fn sort_summaries(summaries: &mut [VaccineSummary]) {
    summaries.sort_by(|a, b| {
        a.vaccine_type
            .rank()
            .cmp(&b.vaccine_type.rank())
            .then_with(|| cmp_ignore_case(&a.name, &b.name))
    });
}

/// A clinical trial run for a vaccine. Ages are in months.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ClinicalTrial {
    pub id: i64,
    #[serde(default)]
    pub vaccine_id: Option<i64>,
    #[serde(default, deserialize_with = "de::string_or_null")]
    pub trial_phase: String,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub duration_months: Option<i64>,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub participant_count: Option<i64>,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub age_range_min: Option<i64>,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub age_range_max: Option<i64>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub trial_identifier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub monitoring_period_days: Option<i64>,
}

impl ClinicalTrial {
    /// Human-readable age range; a missing bound is unbounded.
    pub fn age_range_display(&self) -> String {
        match (self.age_range_min, self.age_range_max) {
            (Some(min), Some(max)) => format!("{}-{} months", min, max),
            (Some(min), None) => format!("{}+ months", min),
            (None, Some(max)) => format!("up to {} months", max),
            (None, None) => "any age".to_string(),
        }
    }
}

/// An adverse effect reported for a vaccine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AdverseEffect {
    pub id: i64,
    #[serde(default)]
    pub vaccine_id: Option<i64>,
    pub effect_name: String,
    #[serde(default)]
    pub severity: Option<String>,
    /// Percentage of recipients.
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub occurrence_rate: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub reported_cases: Option<i64>,
    /// Conventionally "clinical_trial" or "post_marketing".
    #[serde(default)]
    pub data_source: Option<String>,
}

impl AdverseEffect {
    pub fn severity_level(&self) -> Severity {
        Severity::from_label(self.severity.as_deref())
    }
}

/// A vaccine with its trials and adverse effects, as cached and displayed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct VaccineDetails {
    #[serde(flatten)]
    pub vaccine: Vaccine,
    #[serde(default, rename = "clinicalTrials")]
    pub clinical_trials: Vec<ClinicalTrial>,
    #[serde(default, rename = "adverseEffects")]
    pub adverse_effects: Vec<AdverseEffect>,
}

impl VaccineDetails {
    pub fn id(&self) -> i64 {
        self.vaccine.id
    }

    /// Apply read-time derivations: category from name, adverse effects
    /// ordered by severity then name. Idempotent.
    pub fn prepare(&mut self) {
        self.vaccine.categorize();
        sort_adverse_effects(&mut self.adverse_effects);
    }
}
