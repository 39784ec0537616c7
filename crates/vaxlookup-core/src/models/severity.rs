//! Adverse-effect severity ordering.

use std::cmp::Ordering;

use crate::models::AdverseEffect;
use crate::utils::cmp_ignore_case;

/// Conventional severity labels, ordered most severe first.
///
/// Severity is stored as free text, so anything outside the conventional
/// set parses as `Unknown` and sorts after every known level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Severity {
    Severe = 1,
    Serious = 2,
    Moderate = 3,
    Mild = 4,
    Local = 5,
    Systemic = 6,
    Unknown = 999,
}

impl Severity {
    /// Parse a severity label (case-insensitive, surrounding whitespace ignored).
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Severity::Unknown;
        };
        match label.trim().to_lowercase().as_str() {
            "severe" => Severity::Severe,
            "serious" => Severity::Serious,
            "moderate" => Severity::Moderate,
            "mild" => Severity::Mild,
            "local" => Severity::Local,
            "systemic" => Severity::Systemic,
            _ => Severity::Unknown,
        }
    }

    /// Sort key: 1 (severe) through 6 (systemic), 999 for anything else.
    pub fn rank(&self) -> u16 {
        *self as u16
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Severity::Severe => "Severe",
            Severity::Serious => "Serious",
            Severity::Moderate => "Moderate",
            Severity::Mild => "Mild",
            Severity::Local => "Local",
            Severity::Systemic => "Systemic",
            Severity::Unknown => "Unknown",
        }
    }
}

/// Rank of a free-text severity label.
pub fn severity_rank(label: Option<&str>) -> u16 {
    Severity::from_label(label).rank()
}

/// Compare two adverse effects by (severity rank, effect name).
pub fn cmp_adverse_effects(a: &AdverseEffect, b: &AdverseEffect) -> Ordering {
    severity_rank(a.severity.as_deref())
        .cmp(&severity_rank(b.severity.as_deref()))
        .then_with(|| cmp_ignore_case(&a.effect_name, &b.effect_name))
}

/// Sort adverse effects most severe first, then alphabetically by name.
pub fn sort_adverse_effects(effects: &mut [AdverseEffect]) {
    effects.sort_by(cmp_adverse_effects);
}
