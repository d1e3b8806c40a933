pub mod chart;
pub mod config;
pub mod date;
pub mod extract;
pub mod group;
pub mod pipeline;
pub mod report;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Round a currency amount to two decimals, half away from zero.
///
/// Currency values are accumulated as `f64` and only rounded at serialization
/// boundaries so repeated sums do not drift.
#[must_use]
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format an amount with K/M/B units for chart annotations.
///
/// ```rust
/// assert_eq!(fleet_reports::human_amount(1_488.9), "1.49K");
/// assert_eq!(fleet_reports::human_amount(150.0), "150.00");
/// ```
#[must_use]
pub fn human_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{value:.2}")
    }
}

/// Resolve the input XML file path to an absolute path.
///
/// # Errors
/// Returns an error if the path does not exist or is not an XML file.
pub fn resolve_input_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("Input path does not exist or is not accessible: '{}'", path.display());
    }
    if !path.is_file() || path.extension() != Some(OsStr::new("xml")) {
        anyhow::bail!("Input path is not an XML file: {}", path.display());
    }
    Ok(dunce::canonicalize(path)?)
}

/// Resolve the output base directory, creating it when an explicit path is given.
/// Defaults to the input file's parent directory.
///
/// # Errors
/// Returns an error if the directory cannot be created or resolved.
pub fn resolve_output_dir(path: Option<&str>, input_file: &Path) -> Result<PathBuf> {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(output) => {
            let dir = PathBuf::from(output);
            fs::create_dir_all(&dir).with_context(|| format!("Failed to create output directory: {output}"))?;
            Ok(dunce::canonicalize(&dir)?)
        }
        None => Ok(input_file
            .parent()
            .context("Failed to get parent directory of input file")?
            .to_path_buf()),
    }
}

/// Assert two f64 values are equal within currency tolerance.
pub fn assert_f64_eq(a: f64, b: f64) {
    let epsilon = 1e-6;
    assert!(
        (a - b).abs() <= epsilon,
        "Values are not equal: {a} and {b} (epsilon = {epsilon})"
    );
}
