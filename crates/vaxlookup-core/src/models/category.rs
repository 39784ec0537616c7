//! Vaccine categorization by product name.
//!
//! Categories are inferred from free-text names through [`CATEGORY_RULES`],
//! an ordered table of substring predicates. The first matching rule wins,
//! so a name that mentions two diseases lands in whichever category is
//! declared first. Display order is a separate, curated ranking
//! ([`VaccineCategory::rank`]) and does not follow the rule order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Disease/target category of a vaccine, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum VaccineCategory {
    #[serde(rename = "Hepatitis B")]
    HepatitisB,
    #[serde(rename = "COVID-19")]
    Covid19,
    #[serde(rename = "MMR (Measles, Mumps, Rubella)")]
    Mmr,
    #[serde(rename = "DTaP/Tdap (Diphtheria, Tetanus, Pertussis)")]
    Dtap,
    #[serde(rename = "Influenza")]
    Influenza,
    #[serde(rename = "HPV (Human Papillomavirus)")]
    Hpv,
    #[serde(rename = "Pneumococcal")]
    Pneumococcal,
    #[serde(rename = "Polio")]
    Polio,
    #[serde(rename = "Varicella (Chickenpox)")]
    Varicella,
    #[serde(rename = "Haemophilus influenzae type b (Hib)")]
    Hib,
    #[serde(rename = "Rotavirus")]
    Rotavirus,
    #[serde(rename = "Meningococcal")]
    Meningococcal,
    #[serde(rename = "Hepatitis A")]
    HepatitisA,
    #[serde(rename = "Zoster (Shingles)")]
    Zoster,
    #[serde(rename = "Rabies")]
    Rabies,
    #[serde(rename = "Smallpox")]
    Smallpox,
    #[default]
    #[serde(rename = "Other")]
    Other,
}

/// One classification rule: the category, and a disjunction of clauses.
/// A clause matches when the lowercased name contains every one of its needles.
pub type CategoryRule = (VaccineCategory, &'static [&'static [&'static str]]);

/// Classification rules in match order. Earlier rules take precedence.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    (VaccineCategory::HepatitisB, &[&["hepatitis", "b"], &["hep", "b"]]),
    (VaccineCategory::HepatitisA, &[&["hepatitis", "a"], &["hep", "a"]]),
    (VaccineCategory::Covid19, &[&["covid"], &["coronavirus"]]),
    (VaccineCategory::Influenza, &[&["influenza"], &["flu"]]),
    (
        VaccineCategory::Mmr,
        &[&["mmr"], &["measles"], &["mumps"], &["rubella"]],
    ),
    (
        VaccineCategory::Dtap,
        &[
            &["dtap"],
            &["tdap"],
            &["diphtheria"],
            &["tetanus"],
            &["pertussis"],
            &["adacel"],
            &["boostrix"],
            &["tenivac"],
        ],
    ),
    (VaccineCategory::Pneumococcal, &[&["pneumo"]]),
    (
        VaccineCategory::Meningococcal,
        &[&["meningococcal"], &["meningitis"]],
    ),
    (
        VaccineCategory::Hpv,
        &[&["hpv"], &["papillomavirus"], &["cervarix"], &["gardasil"]],
    ),
    (VaccineCategory::Varicella, &[&["varicella"], &["chickenpox"]]),
    (VaccineCategory::Zoster, &[&["zoster"], &["shingles"]]),
    (VaccineCategory::Rotavirus, &[&["rotavirus"], &["rota"]]),
    (VaccineCategory::Polio, &[&["polio"], &["ipv"]]),
    (VaccineCategory::Hib, &[&["hib"], &["haemophilus"]]),
    (VaccineCategory::Rabies, &[&["rabies"]]),
    (VaccineCategory::Smallpox, &[&["smallpox"]]),
];

/// Classify a vaccine by its product name (case-insensitive).
///
/// Total: names that match no rule, including the empty string, are `Other`.
pub fn classify(name: &str) -> VaccineCategory {
    let lower = name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, clauses)| {
            clauses
                .iter()
                .any(|needles| needles.iter().all(|needle| lower.contains(*needle)))
        })
        .map(|(category, _)| *category)
        .unwrap_or(VaccineCategory::Other)
}

/// Display rank for a category label; unrecognized labels rank with `Other`.
pub fn rank_of_label(label: &str) -> u8 {
    VaccineCategory::from_label(label).rank()
}

impl VaccineCategory {
    /// Every category in display-rank order.
    pub const ALL: [VaccineCategory; 17] = [
        VaccineCategory::HepatitisB,
        VaccineCategory::Covid19,
        VaccineCategory::Mmr,
        VaccineCategory::Dtap,
        VaccineCategory::Influenza,
        VaccineCategory::Hpv,
        VaccineCategory::Pneumococcal,
        VaccineCategory::Polio,
        VaccineCategory::Varicella,
        VaccineCategory::Hib,
        VaccineCategory::Rotavirus,
        VaccineCategory::Meningococcal,
        VaccineCategory::HepatitisA,
        VaccineCategory::Zoster,
        VaccineCategory::Rabies,
        VaccineCategory::Smallpox,
        VaccineCategory::Other,
    ];

    /// Curated display priority in `1..=17`, used as the primary list sort key.
    pub fn rank(&self) -> u8 {
        match self {
            VaccineCategory::HepatitisB => 1,
            VaccineCategory::Covid19 => 2,
            VaccineCategory::Mmr => 3,
            VaccineCategory::Dtap => 4,
            VaccineCategory::Influenza => 5,
            VaccineCategory::Hpv => 6,
            VaccineCategory::Pneumococcal => 7,
            VaccineCategory::Polio => 8,
            VaccineCategory::Varicella => 9,
            VaccineCategory::Hib => 10,
            VaccineCategory::Rotavirus => 11,
            VaccineCategory::Meningococcal => 12,
            VaccineCategory::HepatitisA => 13,
            VaccineCategory::Zoster => 14,
            VaccineCategory::Rabies => 15,
            VaccineCategory::Smallpox => 16,
            VaccineCategory::Other => 17,
        }
    }

    /// Get the display label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            VaccineCategory::HepatitisB => "Hepatitis B",
            VaccineCategory::Covid19 => "COVID-19",
            VaccineCategory::Mmr => "MMR (Measles, Mumps, Rubella)",
            VaccineCategory::Dtap => "DTaP/Tdap (Diphtheria, Tetanus, Pertussis)",
            VaccineCategory::Influenza => "Influenza",
            VaccineCategory::Hpv => "HPV (Human Papillomavirus)",
            VaccineCategory::Pneumococcal => "Pneumococcal",
            VaccineCategory::Polio => "Polio",
            VaccineCategory::Varicella => "Varicella (Chickenpox)",
            VaccineCategory::Hib => "Haemophilus influenzae type b (Hib)",
            VaccineCategory::Rotavirus => "Rotavirus",
            VaccineCategory::Meningococcal => "Meningococcal",
            VaccineCategory::HepatitisA => "Hepatitis A",
            VaccineCategory::Zoster => "Zoster (Shingles)",
            VaccineCategory::Rabies => "Rabies",
            VaccineCategory::Smallpox => "Smallpox",
            VaccineCategory::Other => "Other",
        }
    }

    /// Parse a display label. Anything unrecognized maps to `Other`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.label() == label)
            .unwrap_or(VaccineCategory::Other)
    }
}

impl fmt::Display for VaccineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Expected rule order. Changing the table must be a deliberate edit here too.
    const EXPECTED_RULE_ORDER: [VaccineCategory; 16] = [
        VaccineCategory::HepatitisB,
        VaccineCategory::HepatitisA,
        VaccineCategory::Covid19,
        VaccineCategory::Influenza,
        VaccineCategory::Mmr,
        VaccineCategory::Dtap,
        VaccineCategory::Pneumococcal,
        VaccineCategory::Meningococcal,
        VaccineCategory::Hpv,
        VaccineCategory::Varicella,
        VaccineCategory::Zoster,
        VaccineCategory::Rotavirus,
        VaccineCategory::Polio,
        VaccineCategory::Hib,
        VaccineCategory::Rabies,
        VaccineCategory::Smallpox,
    ];

    fn rule_position(category: VaccineCategory) -> usize {
        CATEGORY_RULES
            .iter()
            .position(|(c, _)| *c == category)
            .unwrap()
    }

    #[test]
    fn test_rule_order_table() {
        let actual: Vec<VaccineCategory> = CATEGORY_RULES.iter().map(|(c, _)| *c).collect();
        assert_eq!(actual, EXPECTED_RULE_ORDER);
    }

    #[test]
    fn test_classify_known_products() {
        let cases = [
            ("Recombivax HB (Hepatitis B)", VaccineCategory::HepatitisB),
            ("Hep-B Shot", VaccineCategory::HepatitisB),
            ("Havrix (Hepatitis A)", VaccineCategory::HepatitisA),
            ("Comirnaty COVID-19 Vaccine", VaccineCategory::Covid19),
            ("Fluzone High-Dose", VaccineCategory::Influenza),
            ("M-M-R II (Measles, Mumps, Rubella)", VaccineCategory::Mmr),
            ("Adacel", VaccineCategory::Dtap),
            ("Prevnar 20 (Pneumococcal)", VaccineCategory::Pneumococcal),
            ("Menveo (Meningococcal)", VaccineCategory::Meningococcal),
            ("Gardasil 9", VaccineCategory::Hpv),
            ("Varicella Virus Vaccine Live", VaccineCategory::Varicella),
            ("Zostavax (Zoster)", VaccineCategory::Zoster),
            ("RotaTeq", VaccineCategory::Rotavirus),
            ("IPOL (Poliovirus)", VaccineCategory::Polio),
            ("ActHIB", VaccineCategory::Hib),
            ("Imovax Rabies", VaccineCategory::Rabies),
            ("ACAM2000 (Smallpox)", VaccineCategory::Smallpox),
            ("Spikevax", VaccineCategory::Other),
        ];
        for (name, expected) in cases {
            assert_eq!(classify(name), expected, "classify({:?})", name);
        }
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("COVID"), VaccineCategory::Covid19);
        assert_eq!(classify("covid"), VaccineCategory::Covid19);
        assert_eq!(classify("CoViD booster"), VaccineCategory::Covid19);
    }

    #[test]
    fn test_classify_empty_is_other() {
        assert_eq!(classify(""), VaccineCategory::Other);
    }

    #[test]
    fn test_classify_overlap_uses_first_declared_rule() {
        // Covid precedes MMR in the rule table.
        assert!(rule_position(VaccineCategory::Covid19) < rule_position(VaccineCategory::Mmr));
        for name in ["COVID measles combo", "Measles + Covid", "xcovidxmeaslesx"] {
            assert_eq!(classify(name), VaccineCategory::Covid19, "classify({:?})", name);
        }

        // Hepatitis B precedes Covid, and "hep" plus any "b" is enough.
        assert_eq!(classify("Hepatitis covid bivalent"), VaccineCategory::HepatitisB);
        // Hepatitis A needs only an "a", and precedes Covid.
        assert_eq!(classify("Hepatitis covid"), VaccineCategory::HepatitisA);
    }

    #[test]
    fn test_rank_is_bijection_onto_1_to_17() {
        let ranks: HashSet<u8> = VaccineCategory::ALL.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks.len(), 17);
        assert_eq!(ranks, (1..=17).collect::<HashSet<u8>>());
    }

    #[test]
    fn test_all_is_in_rank_order() {
        for (i, category) in VaccineCategory::ALL.iter().enumerate() {
            assert_eq!(category.rank() as usize, i + 1);
        }
    }

    #[test]
    fn test_rank_fixed_values() {
        assert_eq!(VaccineCategory::HepatitisB.rank(), 1);
        assert_eq!(VaccineCategory::Covid19.rank(), 2);
        assert_eq!(VaccineCategory::HepatitisA.rank(), 13);
        assert_eq!(VaccineCategory::Other.rank(), 17);
    }

    #[test]
    fn test_every_classifier_output_has_rank() {
        for (category, _) in CATEGORY_RULES {
            assert!((1..=16).contains(&category.rank()));
        }
        assert_eq!(classify("nothing matches here").rank(), 17);
    }

    #[test]
    fn test_rank_of_label() {
        assert_eq!(rank_of_label("Hepatitis B"), 1);
        assert_eq!(rank_of_label("Other"), 17);
        assert_eq!(rank_of_label("Not A Category"), 17);
        assert_eq!(rank_of_label(""), 17);
    }

    #[test]
    fn test_label_round_trip() {
        for category in VaccineCategory::ALL {
            assert_eq!(VaccineCategory::from_label(category.label()), category);
            assert_eq!(category.to_string(), category.label());
        }
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&VaccineCategory::Mmr).unwrap();
        assert_eq!(json, "\"MMR (Measles, Mumps, Rubella)\"");
    }
}
