//! generate_all_reports - Generate spreadsheets and charts from a Crystal
//! Reports invoice XML export.
//!
//! Writes `invoices.xlsx`, `grouped_by_truck.csv`, `grouped_by_truck.xlsx`,
//! a bar chart of totals per vehicle and a labor-vs-parts pie chart into a
//! folder named after the latest invoice date.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use fleet_reports::config::ReportsConfig;
use fleet_reports::pipeline::{self, ReportOptions};

/// Command line arguments for generate_all_reports.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Generate spreadsheet and chart reports from a Crystal Reports invoice XML export"
)]
pub struct Args {
    /// Crystal Reports XML export file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub xml_file: PathBuf,

    /// Optional output base directory (default is the input file's directory)
    #[arg(short, long, name = "OUTPUT_DIR")]
    pub output: Option<String>,

    /// Customer name shown in chart subtitles
    #[arg(long)]
    pub customer: Option<String>,

    /// Date range text shown in chart subtitles
    #[arg(long)]
    pub date_range: Option<String>,

    /// Also write per-month report folders
    #[arg(short, long)]
    pub monthly: bool,

    /// Also write per-quarter report folders
    #[arg(short, long)]
    pub quarterly: bool,

    /// Print each extracted invoice line
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let user_config = ReportsConfig::get_user_config()?;
    let options = build_options(&args, &user_config)?;
    pipeline::run_reports(&options)?;
    Ok(())
}

/// Combine command line args and user config into report options.
/// CLI flags OR with config values.
fn build_options(args: &Args, user_config: &ReportsConfig) -> Result<ReportOptions> {
    let xml_file = fleet_reports::resolve_input_file(&args.xml_file)?;
    let output_dir = fleet_reports::resolve_output_dir(args.output.as_deref(), &xml_file)?;

    Ok(ReportOptions {
        xml_file,
        output_dir,
        customer: args.customer.clone(),
        date_range: args.date_range.clone(),
        monthly: args.monthly || user_config.monthly,
        quarterly: args.quarterly || user_config.quarterly,
        verbose: args.verbose || user_config.verbose,
    })
}
