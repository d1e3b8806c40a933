//! Write invoice lines and grouped totals to XLSX and CSV files.
//!
//! Existing files at the target paths are overwritten.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rust_xlsxwriter::{Format, FormatBorder, Workbook};

use crate::extract::InvoiceLine;
use crate::group::{GroupedTotal, sorted_by_total_desc};

/// Column headers for the invoice spreadsheet.
pub const INVOICE_HEADERS: [&str; 13] = [
    "Invoice", "Date", "Truck", "License", "Unit", "Parts", "Labor", "Discount", "Haz Mat", "Supplies", "Tax",
    "Total", "Vehicle",
];

/// Column headers for the grouped spreadsheet and CSV.
pub const GROUPED_HEADERS: [&str; 10] = [
    "vehicle",
    "Unit",
    "quantity of invoices",
    "Parts",
    "Labor",
    "Discount",
    "Haz Mat",
    "Supplies",
    "Tax",
    "Total",
];

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color("C6E0B4")
}

/// Write one row per invoice line to `invoices.xlsx`.
pub fn write_invoices_xlsx(lines: &[InvoiceLine], path: &Path) -> Result<()> {
    println!("{}", format!("Writing invoices to:  {}", path.display()).green());
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Invoices")?;
    let header_format = header_format();

    if let Some(first) = lines.first() {
        sheet.serialize_headers_with_format::<InvoiceLine>(0, 0, first, &header_format)?;
        sheet.serialize(&lines)?;
    } else {
        for (column, header) in INVOICE_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, column as u16, *header, &header_format)?;
        }
    }
    sheet.autofit();

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write one row per grouped total to `grouped_by_truck.xlsx`,
/// sorted by total descending.
pub fn write_grouped_xlsx(groups: &[GroupedTotal], path: &Path) -> Result<()> {
    println!("{}", format!("Writing grouped XLSX: {}", path.display()).green());
    let sorted = sorted_by_total_desc(groups.to_vec());
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Grouped by Truck")?;
    let header_format = header_format();

    if let Some(first) = sorted.first() {
        sheet.serialize_headers_with_format::<GroupedTotal>(0, 0, first, &header_format)?;
        sheet.serialize(&sorted)?;
    } else {
        for (column, header) in GROUPED_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, column as u16, *header, &header_format)?;
        }
    }
    sheet.autofit();

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the grouped totals to `grouped_by_truck.csv`, sorted by total
/// descending. This is the table the chart stage reads back.
pub fn write_grouped_csv(groups: &[GroupedTotal], path: &Path) -> Result<()> {
    println!("{}", format!("Writing grouped CSV:  {}", path.display()).green());
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Failed to write {}", path.display()))?;

    if groups.is_empty() {
        writer.write_record(GROUPED_HEADERS)?;
    }
    for group in sorted_by_total_desc(groups.to_vec()) {
        writer.serialize(group)?;
    }
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
