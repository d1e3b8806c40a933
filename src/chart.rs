//! Render the bar and pie charts from the persisted grouped CSV table.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use plotters::element::Pie;
use plotters::prelude::*;

use crate::extract::parse_amount;
use crate::human_amount;

/// One row read back from `grouped_by_truck.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub vehicle: String,
    pub parts: f64,
    pub labor: f64,
    pub total: f64,
}

/// Read the grouped table back from CSV.
///
/// # Errors
/// Returns an error if the file cannot be read or a required column
/// (`vehicle`, `Parts`, `Labor`, `Total`) is missing.
pub fn read_grouped_csv(path: &Path) -> Result<Vec<GroupedRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to read grouped table: {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("Missing column '{name}' in grouped table: {}", path.display()))
    };
    let vehicle_column = column("vehicle")?;
    let parts_column = column("Parts")?;
    let labor_column = column("Labor")?;
    let total_column = column("Total")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let vehicle = record.get(vehicle_column).unwrap_or("").trim();
        rows.push(GroupedRow {
            vehicle: if vehicle.is_empty() {
                "Unknown".to_string()
            } else {
                vehicle.to_string()
            },
            parts: parse_amount(record.get(parts_column).unwrap_or("")),
            labor: parse_amount(record.get(labor_column).unwrap_or("")),
            total: parse_amount(record.get(total_column).unwrap_or("")),
        });
    }
    Ok(rows)
}

/// Build the chart subtitle from explicit customer and date-range text,
/// falling back to the detected date range when neither was given.
#[must_use]
pub fn chart_subtitle(
    customer: Option<&str>,
    date_range: Option<&str>,
    detected_range: Option<&str>,
) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(customer) = customer {
        parts.push(customer);
    }
    if let Some(range) = date_range {
        parts.push(range);
    }
    if parts.is_empty()
        && let Some(detected) = detected_range
    {
        parts.push(detected);
    }
    if parts.is_empty() { None } else { Some(parts.join(" - ")) }
}

fn bar_chart_caption(overall: f64, subtitle: Option<&str>) -> String {
    let total = format!("Total (all vehicles): {}", human_amount(overall));
    match subtitle {
        Some(subtitle) => format!("Total per vehicle | {subtitle} | {total}"),
        None => format!("Total per vehicle | {total}"),
    }
}

fn draw_err<E: std::fmt::Display>(error: E) -> anyhow::Error {
    anyhow!("Failed to render chart: {error}")
}

/// Render `grouped_totals.png`: one bar per vehicle, height = total,
/// sorted descending. Skips the image with a message when there is no data.
pub fn render_bar_chart(rows: &[GroupedRow], path: &Path, subtitle: Option<&str>) -> Result<()> {
    if rows.is_empty() {
        eprintln!("{}", format!("No data to chart, skipping {}", path.display()).yellow());
        return Ok(());
    }

    let mut sorted: Vec<&GroupedRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    let labels: Vec<String> = sorted.iter().map(|row| row.vehicle.clone()).collect();
    let values: Vec<f64> = sorted.iter().map(|row| row.total).collect();
    let overall: f64 = values.iter().sum();
    let y_max = values.iter().copied().fold(0.0_f64, f64::max).max(1.0) * 1.15;
    let bar_count = values.len() as i32;

    let width = (labels.len() as u32 * 120).clamp(900, 1920);
    let root = BitMapBackend::new(path, (width, 720)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(bar_chart_caption(overall, subtitle), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(140)
        .y_label_area_size(90)
        .build_cartesian_2d((0..bar_count).into_segmented(), 0.0..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i as usize).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .y_desc("Total")
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, value)| {
            let left = SegmentValue::Exact(i as i32);
            let right = SegmentValue::Exact(i as i32 + 1);
            Rectangle::new([(left, 0.0), (right, *value)], BLUE.mix(0.6).filled())
        }))
        .map_err(draw_err)?;

    // value annotation above each bar
    chart
        .draw_series(values.iter().enumerate().map(|(i, value)| {
            Text::new(
                human_amount(*value),
                (SegmentValue::CenterOf(i as i32), *value),
                ("sans-serif", 14).into_font(),
            )
        }))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    println!("{}", format!("Wrote chart: {}", path.display()).green());
    Ok(())
}

/// Render `labor_vs_parts_pie.png`: summed labor vs summed parts across all
/// vehicles. Skips the image with a message when both sums are zero.
pub fn render_pie_chart(rows: &[GroupedRow], path: &Path, subtitle: Option<&str>) -> Result<()> {
    let labor: f64 = rows.iter().map(|row| row.labor).sum();
    let parts: f64 = rows.iter().map(|row| row.parts).sum();
    if (labor + parts).abs() < f64::EPSILON {
        eprintln!(
            "{}",
            format!("No labor or parts amounts to chart, skipping {}", path.display()).yellow()
        );
        return Ok(());
    }

    let root = BitMapBackend::new(path, (720, 780)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let area = root
        .titled("Total labor vs total parts", ("sans-serif", 26))
        .map_err(draw_err)?;
    let area = match subtitle {
        Some(subtitle) => area.titled(subtitle, ("sans-serif", 18)).map_err(draw_err)?,
        None => area,
    };

    let sizes = [labor, parts];
    let colors = [RGBColor(76, 120, 168), RGBColor(245, 133, 24)];
    let labels = [
        format!("Labor {}", human_amount(labor)),
        format!("Parts {}", human_amount(parts)),
    ];
    let center = (360, 400);
    let radius = 250.0;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style(("sans-serif", 20).into_font());
    pie.percentages(("sans-serif", 16).into_font());
    area.draw(&pie).map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    println!("{}", format!("Wrote chart: {}", path.display()).green());
    Ok(())
}


#[cfg(test)]
mod test_chart_subtitle {
    use super::*;

    #[test]
    fn customer_and_date_range_are_joined() {
        let subtitle = chart_subtitle(Some("Acme Corp"), Some("2025-01-01 to 2025-01-31"), None);
        assert_eq!(subtitle.as_deref(), Some("Acme Corp - 2025-01-01 to 2025-01-31"));
    }

    #[test]
    fn customer_only() {
        assert_eq!(chart_subtitle(Some("Acme Corp"), None, None).as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn detected_range_used_only_as_fallback() {
        let subtitle = chart_subtitle(None, None, Some("2025-01-05 to 2025-01-20"));
        assert_eq!(subtitle.as_deref(), Some("2025-01-05 to 2025-01-20"));

        let explicit = chart_subtitle(Some("Acme Corp"), None, Some("2025-01-05 to 2025-01-20"));
        assert_eq!(explicit.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn nothing_yields_none() {
        assert_eq!(chart_subtitle(None, None, None), None);
    }

    #[test]
    fn bar_caption_includes_subtitle_and_total() {
        let caption = bar_chart_caption(200.0, Some("Acme Corp - 2025-01"));
        assert!(caption.contains("Total per vehicle"));
        assert!(caption.contains("Acme Corp - 2025-01"));
        assert!(caption.contains("200.00"));
    }
}
