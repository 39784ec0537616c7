//! Data models for vaccine information.
//!
//! This module contains the data structures used to represent vaccine
//! data, including:
//!
//! - `Vaccine`, `VaccineSummary`, `VaccineDetails`: vaccine records and the
//!   assembled detail snapshot that gets cached
//! - `ClinicalTrial`, `AdverseEffect`: per-vaccine child records
//! - `VaccineCategory`: name-derived category with its display rank
//! - `Severity`: adverse effect ordering
//! - `VaccineStats`, `VaccineCounts`, `RecentVaccine`: overview statistics

pub mod category;
pub(crate) mod de;
pub mod severity;
pub mod stats;
pub mod vaccine;

pub use category::{classify, rank_of_label, VaccineCategory, CATEGORY_RULES};
pub use severity::{severity_rank, sort_adverse_effects, Severity};
pub use stats::{RecentVaccine, VaccineCounts, VaccineStats};
pub use vaccine::{
    sort_summaries, AdverseEffect, ClinicalTrial, Vaccine, VaccineDetails, VaccineSummary,
};
