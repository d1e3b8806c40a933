//! End-to-end report pipeline: extract, aggregate, write, render.
//!
//! All artifacts for a run land in a folder named after the latest invoice
//! date in the data. Steps run strictly in order and any failure aborts the
//! run; partial output is not cleaned up.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;

use crate::chart;
use crate::date;
use crate::extract::{self, InvoiceLine};
use crate::group;
use crate::report;

/// Options for one report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Crystal Reports XML export to read.
    pub xml_file: PathBuf,
    /// Base directory; the dated folder is created beneath it.
    pub output_dir: PathBuf,
    /// Customer name shown in chart subtitles.
    pub customer: Option<String>,
    /// Explicit date range text shown in chart subtitles.
    pub date_range: Option<String>,
    /// Also write per-month report folders.
    pub monthly: bool,
    /// Also write per-quarter report folders.
    pub quarterly: bool,
    /// Print each extracted invoice line.
    pub verbose: bool,
}

/// Run the full pipeline and return the dated output folder.
pub fn run_reports(options: &ReportOptions) -> Result<PathBuf> {
    println!(
        "{}",
        format!("Parsing file: {}", options.xml_file.display()).bold().magenta()
    );
    let xml_text = fs::read_to_string(&options.xml_file)
        .with_context(|| format!("Failed to read input file: {}", options.xml_file.display()))?;
    let lines = extract::extract_invoices(&xml_text)?;
    println!(
        "Found {} invoice lines for {} vehicles",
        lines.len(),
        distinct_vehicle_count(&lines)
    );
    if options.verbose {
        for line in &lines {
            println!("  {line}");
        }
    }
    warn_on_line_mismatches(&lines);

    let folder_name = date::latest_date(lines.iter().filter_map(|line| line.date))
        .map_or_else(|| "unknown_date".to_string(), |d| d.format("%Y-%m-%d").to_string());
    let out_dir = options.output_dir.join(folder_name);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let subtitle = chart::chart_subtitle(
        options.customer.as_deref(),
        options.date_range.as_deref(),
        date::date_range_text(lines.iter().filter_map(|line| line.date)).as_deref(),
    );
    write_report_set(&lines, &out_dir, subtitle.as_deref())?;

    if options.monthly {
        write_period_reports(&lines, &out_dir, options.customer.as_deref(), date::month_label)?;
    }
    if options.quarterly {
        write_period_reports(&lines, &out_dir, options.customer.as_deref(), date::quarter_label)?;
    }

    println!(
        "{}",
        format!("All reports written to: {}", out_dir.display()).bold().green()
    );
    Ok(out_dir)
}

/// Write the spreadsheets and charts for one set of invoice lines.
/// The charts read the grouped table back from its persisted CSV form.
fn write_report_set(lines: &[InvoiceLine], dir: &Path, subtitle: Option<&str>) -> Result<()> {
    let groups = group::group_by_vehicle(lines);
    warn_on_group_mismatches(&groups);

    report::write_invoices_xlsx(lines, &dir.join("invoices.xlsx"))?;
    let csv_path = dir.join("grouped_by_truck.csv");
    report::write_grouped_csv(&groups, &csv_path)?;
    report::write_grouped_xlsx(&groups, &dir.join("grouped_by_truck.xlsx"))?;

    let rows = chart::read_grouped_csv(&csv_path)?;
    chart::render_bar_chart(&rows, &dir.join("grouped_totals.png"), subtitle)?;
    chart::render_pie_chart(&rows, &dir.join("labor_vs_parts_pie.png"), subtitle)?;
    Ok(())
}

/// Write a full report set per period label (month or quarter) into
/// subfolders of the dated output directory. Lines without a parseable date
/// are left out of the period breakdowns.
fn write_period_reports(
    lines: &[InvoiceLine],
    out_dir: &Path,
    customer: Option<&str>,
    label: fn(NaiveDate) -> String,
) -> Result<()> {
    for (period, subset) in partition_by_period(lines, label) {
        let period_dir = out_dir.join(&period);
        fs::create_dir_all(&period_dir)
            .with_context(|| format!("Failed to create output directory: {}", period_dir.display()))?;
        let subtitle = chart::chart_subtitle(
            customer,
            None,
            date::date_range_text(subset.iter().filter_map(|line| line.date)).as_deref(),
        );
        write_report_set(&subset, &period_dir, subtitle.as_deref())?;
        println!("Reports for {period} written to {}", period_dir.display());
    }
    Ok(())
}

/// Partition lines by a period label, sorted by label.
fn partition_by_period(lines: &[InvoiceLine], label: fn(NaiveDate) -> String) -> Vec<(String, Vec<InvoiceLine>)> {
    let mut periods: BTreeMap<String, Vec<InvoiceLine>> = BTreeMap::new();
    for line in lines {
        if let Some(date) = line.date {
            periods.entry(label(date)).or_default().push(line.clone());
        }
    }
    periods.into_iter().collect()
}

fn distinct_vehicle_count(lines: &[InvoiceLine]) -> usize {
    let mut vehicles: Vec<(&str, &str)> = lines
        .iter()
        .map(|line| (line.vehicle.as_str(), line.unit.as_str()))
        .collect();
    vehicles.sort_unstable();
    vehicles.dedup();
    vehicles.len()
}

fn warn_on_line_mismatches(lines: &[InvoiceLine]) {
    for line in lines.iter().filter(|line| !line.reconciles()) {
        eprintln!(
            "{}",
            format!(
                "Warning: invoice {} categories sum to {:.2} but Total is {:.2}",
                line.invoice,
                line.category_sum(),
                line.total
            )
            .yellow()
        );
    }
}

fn warn_on_group_mismatches(groups: &[group::GroupedTotal]) {
    for group in groups.iter().filter(|group| !group.reconciles()) {
        eprintln!(
            "{}",
            format!(
                "Warning: vehicle {} categories sum to {:.2} but Total is {:.2}",
                group.vehicle,
                group.category_sum(),
                group.total
            )
            .yellow()
        );
    }
}
