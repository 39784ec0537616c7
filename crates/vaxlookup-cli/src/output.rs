//! Plain-text rendering for terminal output.

use vaxlookup_core::utils::{format_date, truncate};
use vaxlookup_core::{CacheStatus, VaccineDetails, VaccineStats, VaccineSummary};

/// Widest manufacturer shown in the vaccine list.
const MANUFACTURER_WIDTH: usize = 24;

/// Widest description shown under an adverse effect.
const DESCRIPTION_WIDTH: usize = 72;

/// Vaccines grouped under a header per category, in the order given.
pub fn print_vaccine_list(vaccines: &[VaccineSummary]) {
    if vaccines.is_empty() {
        println!("No vaccines found");
        return;
    }

    let mut current = None;
    for vaccine in vaccines {
        if current != Some(vaccine.vaccine_type) {
            if current.is_some() {
                println!();
            }
            println!("{}", vaccine.vaccine_type);
            current = Some(vaccine.vaccine_type);
        }
        println!(
            "  {:>5}  {:<40} {:<width$} {}",
            vaccine.id,
            truncate(&vaccine.name, 40),
            truncate(&vaccine.manufacturer, MANUFACTURER_WIDTH),
            format_date(vaccine.fda_approved_date),
            width = MANUFACTURER_WIDTH,
        );
    }
}

pub fn print_vaccine_details(details: &VaccineDetails) {
    let vaccine = &details.vaccine;
    println!("{} (#{})", vaccine.name, vaccine.id);
    println!("  Category:      {}", vaccine.vaccine_type);
    if !vaccine.manufacturer.is_empty() {
        println!("  Manufacturer:  {}", vaccine.manufacturer);
    }
    println!("  FDA approved:  {}", format_date(vaccine.fda_approved_date));
    if vaccine.childhood_schedule_date.is_some() {
        println!(
            "  On schedule:   {}",
            format_date(vaccine.childhood_schedule_date)
        );
    }
    if let Some(url) = &vaccine.fda_url {
        println!("  FDA page:      {}", url);
    }
    if let Some(description) = &vaccine.description {
        println!();
        println!("{}", description);
    }

    println!();
    println!("Clinical trials ({})", details.clinical_trials.len());
    for trial in &details.clinical_trials {
        let participants = trial
            .participant_count
            .map(|n| format!("{} participants", n))
            .unwrap_or_else(|| "participants unknown".to_string());
        println!(
            "  {:<10} {}  {}  {} - {}",
            trial.trial_phase,
            participants,
            trial.age_range_display(),
            format_date(trial.start_date),
            format_date(trial.end_date),
        );
        if let Some(id) = &trial.trial_identifier {
            println!("             {}", id);
        }
    }

    println!();
    println!("Adverse effects ({})", details.adverse_effects.len());
    for effect in &details.adverse_effects {
        let rate = effect
            .occurrence_rate
            .map(|r| format!("{:.4}%", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<9} {:<32} {:>10}",
            effect.severity_level().display_name(),
            truncate(&effect.effect_name, 32),
            rate,
        );
        if let Some(description) = &effect.description {
            println!("            {}", truncate(description, DESCRIPTION_WIDTH));
        }
    }
}

pub fn print_stats(stats: &VaccineStats) {
    println!("Vaccines:         {}", stats.total_vaccines);
    println!("Clinical trials:  {}", stats.total_clinical_trials);
    println!("Adverse effects:  {}", stats.total_adverse_effects);

    if !stats.recently_added.is_empty() {
        println!();
        println!("Recently added");
        for recent in &stats.recently_added {
            let added = recent
                .created_at
                .map(|ts| format_date(Some(ts.date_naive())))
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<40} {}", truncate(&recent.name, 40), added);
        }
    }
}

pub fn print_cache_status(status: &CacheStatus, ids: &[i64]) {
    println!("Cached vaccines:  {}", status.size);
    if status.size > 0 {
        println!("Age:              {} min", status.age_minutes);
        println!(
            "State:            {}",
            if status.is_expired { "expired" } else { "fresh" }
        );
        let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
        println!("Ids (oldest first): {}", ids.join(", "));
    }
}
