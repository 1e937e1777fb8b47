//! Survival statistics table display

use attrition_analysis::survival::SurvivalStats;

/// A row in a survival statistics table
pub(super) struct SurvivalTableRow<'a> {
    /// Label for this row (e.g., covariate level or quartile band)
    pub label: String,
    pub stats: &'a SurvivalStats,
}

fn print_survival_table_header(label_col: &str) {
    println!(
        "  {:<24} {:>8} {:>9} {:>12} {:>12} {:>12}",
        label_col, "N", "Events%", "Mean(Event)", "Mean(All)", "Median(KM)",
    );
}

fn print_survival_table_separator() {
    // label(24) + n(8) + events%(9) + mean_event(12) + mean_all(12) + median_km(12) + spaces(5)
    println!("  {}", "-".repeat(82));
}

fn print_survival_table_row(row: &SurvivalTableRow) {
    let stats = row.stats;
    let median_str = stats
        .median_km
        .map_or("N/A".to_string(), |m| format!("{m:.1}"));

    println!(
        "  {:<24} {:>8} {:>8.1}% {:>12.1} {:>12.1} {:>12}",
        row.label,
        stats.count,
        stats.event_rate * 100.0,
        stats.mean_event_time,
        stats.mean_all,
        median_str,
    );
}

/// Print a formatted survival statistics table
pub(super) fn print_survival_table(label_col: &str, rows: &[SurvivalTableRow]) {
    print_survival_table_header(label_col);
    print_survival_table_separator();

    for row in rows {
        print_survival_table_row(row);
    }
}

/// Print legend explaining table columns
pub(super) fn print_legend() {
    println!("Legend:");
    println!("  Events%     : Share of employees who quit during follow-up");
    println!("  Mean(Event) : Mean tenure of employees who quit (censored excluded)");
    println!("  Mean(All)   : Naive mean tenure of everyone (biased low by censoring)");
    println!("  Median(KM)  : Kaplan-Meier median tenure (handles censoring)");
}
