// Run report generation from subcategory results

use blockpull_scanner::result::SubcategoryResult;
use chrono::Utc;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    pub subcategories: usize,
    pub items_found: usize,
    pub artifacts_written: usize,
    pub switches_attempted: usize,
    pub switches_succeeded: usize,
    pub flavor_mismatches: usize,
    pub failures: usize,
}

impl ScrapeSummary {
    pub fn from_results(results: &[SubcategoryResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, r| {
            summary.subcategories += 1;
            summary.items_found += r.items_found;
            summary.artifacts_written += r.artifacts_written;
            summary.switches_attempted += usize::from(r.switch_attempted);
            summary.switches_succeeded += usize::from(r.switched);
            summary.flavor_mismatches += usize::from(r.flavor_mismatch());
            summary.failures += usize::from(!r.is_ok());
            summary
        })
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generator: &'static str,
    version: &'static str,
    generated_at: String,
    summary: ScrapeSummary,
    results: &'a [SubcategoryResult],
}

/// Renders the run report in the requested format.
pub fn generate_scrape_report(
    results: &[SubcategoryResult],
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(results)),
        ReportFormat::Json => generate_json_report(results),
    }
}

pub fn generate_text_report(results: &[SubcategoryResult]) -> String {
    let summary = ScrapeSummary::from_results(results);

    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n");
    report.push_str(&format!(
        "Generated: {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Subcategories scraped: {}\n", summary.subcategories));
    report.push_str(&format!("  Items found: {}\n", summary.items_found));
    report.push_str(&format!("  Artifacts written: {}\n", summary.artifacts_written));
    report.push_str(&format!(
        "  Flavor switches: {}/{}\n",
        summary.switches_succeeded, summary.switches_attempted
    ));
    if summary.flavor_mismatches > 0 {
        report.push_str(&format!(
            "  Served in another flavor: {}\n",
            summary.flavor_mismatches.to_string().yellow()
        ));
    }
    if summary.failures > 0 {
        report.push_str(&format!(
            "  Failures: {}\n",
            summary.failures.to_string().red()
        ));
    }
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    let mut by_category: BTreeMap<&str, Vec<&SubcategoryResult>> = BTreeMap::new();
    for result in results {
        by_category
            .entry(result.path.category.as_str())
            .or_default()
            .push(result);
    }

    for (category, category_results) in &by_category {
        report.push_str(&format!("## {}\n", category.bold()));
        report.push_str(&format!("  {} subcategories\n\n", category_results.len()));

        for result in category_results {
            report.push_str(&format_result_line(result));
            report.push('\n');
        }
        report.push('\n');
    }

    report
}

fn format_result_line(result: &SubcategoryResult) -> String {
    let marker = if !result.is_ok() {
        "✗".red()
    } else if result.flavor_mismatch() {
        "⚠".yellow()
    } else {
        "✓".green()
    };

    let mut line = format!(
        "  {} {} [{}]",
        marker, result.path.subcategory, result.desired_flavor
    );

    match result.error {
        Some(ref error) => line.push_str(&format!(" {}", error.red())),
        None => {
            line.push_str(&format!(
                " {} items, {} written",
                result.items_found, result.artifacts_written
            ));
            if let Some(served) = result.served_flavor
                && result.flavor_mismatch()
            {
                line.push_str(&format!(" {}", format!("(served {})", served).yellow()));
            }
            if result.switched {
                line.push_str(&format!(" {}", "switched".bright_black()));
            }
        }
    }

    line
}

pub fn generate_json_report(results: &[SubcategoryResult]) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        generator: "blockpull",
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now().to_rfc3339(),
        summary: ScrapeSummary::from_results(results),
        results,
    };
    serde_json::to_string_pretty(&report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
