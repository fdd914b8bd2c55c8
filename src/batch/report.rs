//! Batch report and quota status formatting.
//!
//! Produces the human-readable output for `articast run` and
//! `articast quota`: summary counts plus one table per failure group.

use crate::batch::outcome::{BatchResult, ProcessingError};
use crate::tracker::GenerationEntry;
use chrono::SecondsFormat;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::{AnsiColors, OwoColorize};
use serde::{Deserialize, Serialize};

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_colored_heading(title: &str, color: AnsiColors) -> String {
    format!("{}", title.color(color).bold().underline())
}

/// Format a batch result as human-readable text using comfy-table and
/// styled headings. Successes render green, hard errors red, rejected
/// resources yellow.
pub fn format_batch_report_text(result: &BatchResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Batch Report")));
    out.push_str(&format!("  Run: {}\n", result.run_id));
    out.push_str(&format!(
        "  Candidates processed: {}\n",
        result.total_candidates
    ));
    out.push_str(&format!(
        "  Successful generations: {}\n",
        result.successful_generations.green()
    ));
    out.push_str(&format!(
        "  Successful uploads: {}\n\n",
        result.successful_uploads.green()
    ));

    if result.is_clean() {
        out.push_str(&format!("{}\n", "No errors.".green()));
        return out;
    }

    push_error_section(
        &mut out,
        format_colored_heading("Generation Failures", AnsiColors::Red),
        &result.generation_errors(),
    );
    push_error_section(
        &mut out,
        format_colored_heading("Upload Failures", AnsiColors::Red),
        &result.upload_errors(),
    );
    push_error_section(
        &mut out,
        format_colored_heading("Invalid Resources", AnsiColors::Yellow),
        &result.invalid_resources(),
    );

    let total = format!("Total: {} errors.", result.errors.len());
    out.push_str(&format!("{}\n", total.red()));
    out
}

fn push_error_section(out: &mut String, heading: String, errors: &[&ProcessingError]) {
    if errors.is_empty() {
        return;
    }
    out.push_str(&format!("{}\n\n", heading));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Source URL", "Error"]);
    for error in errors {
        table.add_row(vec![error.url.clone(), error.message.clone()]);
    }
    out.push_str(&format!("{}\n\n", table));
}

/// Rate-limit usage snapshot for `articast quota`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub limit: u32,
    pub used: usize,
    pub remaining: u32,
    pub window_hours: u64,
    pub entries: Vec<GenerationEntry>,
}

/// Format quota status as human-readable text (comfy-table + section heading).
pub fn format_quota_status_text(status: &QuotaStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Quota")));
    out.push_str(&format!(
        "  Used: {} of {} in the last {}h\n",
        status.used, status.limit, status.window_hours
    ));
    out.push_str(&format!("  Remaining: {}\n\n", status.remaining));

    if status.entries.is_empty() {
        out.push_str("No generations recorded in the current window.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Triggered", "Source URL", "Run"]);
    for entry in &status.entries {
        table.add_row(vec![
            entry
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.resource_url.clone(),
            entry.run_id.clone(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
