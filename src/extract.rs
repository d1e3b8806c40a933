//! Extract invoice line items from a Crystal Reports XML export.
//!
//! The export nests invoices in `Group` elements: an outer group per vehicle
//! carries a `{@YmmEngLic}` field, and each inner group holds one invoice with
//! a `{@InvHdr}` header field and the cost-category total fields.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use roxmltree::{Document, Node};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::date::parse_invoice_date;
use crate::round_currency;

static RE_INVOICE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Invoice:?\s*)(\d+)").expect("Failed to create regex pattern for invoice number")
});

static RE_INVOICE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Date:?|Posted On:?)[\s,]*(\d{1,2}/\d{1,2}/\d{2,4})")
        .expect("Failed to create regex pattern for invoice date")
});

/// One row per invoice entry from the export.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub invoice: String,
    pub date: Option<NaiveDate>,
    pub truck: String,
    pub license: String,
    pub unit: String,
    /// Raw vehicle string from the export, also the grouping key.
    pub vehicle: String,
    pub parts: f64,
    pub labor: f64,
    pub discount: f64,
    pub haz_mat: f64,
    pub supplies: f64,
    pub tax: f64,
    pub total: f64,
}

impl InvoiceLine {
    /// Date in `yyyy-mm-dd` format, empty when the export had no parseable date.
    #[must_use]
    pub fn date_text(&self) -> String {
        self.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
    }

    /// Sum of the cost-category columns, which should reconcile with `total`.
    #[must_use]
    pub fn category_sum(&self) -> f64 {
        self.parts + self.labor + self.discount + self.haz_mat + self.supplies + self.tax
    }

    /// Whether the category columns reconcile with the total within half a cent.
    #[must_use]
    pub fn reconciles(&self) -> bool {
        (self.category_sum() - self.total).abs() <= 0.005 + 1e-9
    }

    /// Numeric sort key parsed from the invoice number string.
    fn invoice_sort_key(&self) -> u64 {
        self.invoice.trim().parse().unwrap_or(0)
    }
}

impl fmt::Display for InvoiceLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<10} {:>8} {:>9.2}   {}",
            self.date_text(),
            self.invoice,
            self.total,
            self.vehicle
        )
    }
}

// f64 does not have Eq so this way it uses PartialEq
impl Eq for InvoiceLine {}

impl PartialOrd for InvoiceLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InvoiceLine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.vehicle
            .to_lowercase()
            .cmp(&other.vehicle.to_lowercase())
            .then_with(|| self.date.cmp(&other.date))
            .then_with(|| self.invoice_sort_key().cmp(&other.invoice_sort_key()))
    }
}

impl Serialize for InvoiceLine {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("InvoiceLine", 13)?;

        state.serialize_field("Invoice", &self.invoice)?;
        state.serialize_field("Date", &self.date_text())?;
        state.serialize_field("Truck", &self.truck)?;
        state.serialize_field("License", &self.license)?;
        state.serialize_field("Unit", &self.unit)?;
        state.serialize_field("Parts", &round_currency(self.parts))?;
        state.serialize_field("Labor", &round_currency(self.labor))?;
        state.serialize_field("Discount", &round_currency(self.discount))?;
        state.serialize_field("Haz Mat", &round_currency(self.haz_mat))?;
        state.serialize_field("Supplies", &round_currency(self.supplies))?;
        state.serialize_field("Tax", &round_currency(self.tax))?;
        state.serialize_field("Total", &round_currency(self.total))?;
        state.serialize_field("Vehicle", &self.vehicle)?;

        state.end()
    }
}

/// Parse invoice lines from Crystal Reports XML text.
///
/// A well-formed document with no invoice header fields yields an empty list.
///
/// # Errors
/// Returns an error if the text is not well-formed XML.
pub fn extract_invoices(xml_text: &str) -> Result<Vec<InvoiceLine>> {
    let document = Document::parse(xml_text).context("Failed to parse Crystal Reports XML")?;

    let mut lines: Vec<InvoiceLine> = Vec::new();
    for header_field in document.descendants().filter(|n| is_field(*n, "{@InvHdr}")) {
        let header_text = field_text(header_field);
        let (invoice, date) = parse_invoice_header(&header_text);

        let Some(invoice_group) = enclosing_group(header_field) else {
            continue;
        };
        let vehicle = find_vehicle(invoice_group).unwrap_or_default();
        let (truck, license, unit) = parse_vehicle_fields(&vehicle);

        let amount = |name: &str| parse_amount(&find_field_value(invoice_group, name));
        lines.push(InvoiceLine {
            invoice,
            date,
            truck,
            license,
            unit,
            vehicle,
            parts: amount("{@PartsTotal}"),
            labor: amount("{@LaborTotal}"),
            discount: amount("{@DiscountTotal}"),
            haz_mat: amount("{@HazMat}"),
            supplies: amount("{@Supplies}"),
            tax: amount("{@TaxTotal}"),
            total: amount("{@Total}"),
        });
    }

    lines.sort_unstable();
    Ok(lines)
}

/// Split a vehicle string into truck, license and unit.
///
/// The export formats it as `Vehicle: <truck>, <license>[, <unit>]` where the
/// unit is only present when the last comma part is numeric.
#[must_use]
pub fn parse_vehicle_fields(vehicle: &str) -> (String, String, String) {
    let mut text = vehicle.trim();
    if text.to_lowercase().starts_with("vehicle:") {
        text = text["vehicle:".len()..].trim();
    }
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let truck = parts.first().copied().unwrap_or_default().to_string();

    let mut license = String::new();
    let mut unit = String::new();
    if parts.len() >= 3 {
        let last = parts[parts.len() - 1];
        let digits_only = last.replace(' ', "");
        if !digits_only.is_empty() && digits_only.chars().all(|c| c.is_ascii_digit()) {
            unit = last.to_string();
            license = parts[parts.len() - 2].to_string();
        } else {
            license = last.to_string();
        }
    } else if parts.len() == 2 {
        license = parts[1].to_string();
    }

    (truck, license, unit)
}

/// Pull the invoice number and date out of an invoice header string,
/// e.g. `Invoice: 12345 Date: 12/21/2025`.
#[must_use]
pub fn parse_invoice_header(text: &str) -> (String, Option<NaiveDate>) {
    let invoice = RE_INVOICE_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let date = RE_INVOICE_DATE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_invoice_date(m.as_str()));
    (invoice, date)
}

/// Parse a currency amount string. Commas, currency symbols and whitespace are
/// stripped; parentheses mean negative. Unparseable amounts yield 0.0, as the
/// export leaves unused categories blank.
#[must_use]
pub fn parse_amount(text: &str) -> f64 {
    let mut cleaned = text.trim().replace(['$', '€', ',', ' '], "");
    if cleaned.is_empty() {
        return 0.0;
    }
    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() >= 2 {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }
    let value = cleaned.parse::<f64>().unwrap_or(0.0);
    if negative { -value } else { value }
}

fn is_field(node: Node, field_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == "Field" && node.attribute("FieldName") == Some(field_name)
}

/// Text content of a report field, preferring `FormattedValue` over `Value`.
fn field_text(field: Node) -> String {
    for tag in ["FormattedValue", "Value"] {
        if let Some(child) = field.children().find(|c| c.tag_name().name() == tag)
            && let Some(text) = child.text()
        {
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    String::new()
}

fn enclosing_group<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.ancestors().skip(1).find(|n| n.tag_name().name() == "Group")
}

/// Find the vehicle field by climbing ancestor groups from the invoice group.
fn find_vehicle(invoice_group: Node) -> Option<String> {
    let mut current = Some(invoice_group);
    while let Some(group) = current {
        if let Some(field) = group.descendants().find(|n| is_field(*n, "{@YmmEngLic}")) {
            return Some(field_text(field));
        }
        current = enclosing_group(group);
    }
    None
}

fn find_field_value(group: Node, field_name: &str) -> String {
    group
        .descendants()
        .find(|n| is_field(*n, field_name))
        .map(field_text)
        .unwrap_or_default()
}




#[cfg(test)]
mod test_extract_invoices {
    use super::*;

    use crate::assert_f64_eq;

    const SAMPLE: &str = r#"<CrystalReport xmlns="urn:crystal-reports:schemas:report-detail">
  <Group Level="1">
    <GroupHeader>
      <Section>
        <Field Name="YmmEngLic1" FieldName="{@YmmEngLic}">
          <FormattedValue>Vehicle: TRK1, ABC-123, 101</FormattedValue>
        </Field>
      </Section>
    </GroupHeader>
    <Group Level="2">
      <GroupHeader>
        <Section>
          <Field Name="InvHdr1" FieldName="{@InvHdr}">
            <FormattedValue>Invoice: 1002 Date: 01/12/2025</FormattedValue>
          </Field>
        </Section>
      </GroupHeader>
      <GroupFooter>
        <Section>
          <Field FieldName="{@PartsTotal}"><FormattedValue>40.00</FormattedValue></Field>
          <Field FieldName="{@LaborTotal}"><FormattedValue>20.00</FormattedValue></Field>
          <Field FieldName="{@TaxTotal}"><FormattedValue>0.00</FormattedValue></Field>
          <Field FieldName="{@Total}"><FormattedValue>60.00</FormattedValue></Field>
        </Section>
      </GroupFooter>
    </Group>
    <Group Level="2">
      <GroupHeader>
        <Section>
          <Field Name="InvHdr2" FieldName="{@InvHdr}">
            <FormattedValue>Invoice: 1001 Date: 01/05/2025</FormattedValue>
          </Field>
        </Section>
      </GroupHeader>
      <GroupFooter>
        <Section>
          <Field FieldName="{@PartsTotal}"><FormattedValue>60.00</FormattedValue></Field>
          <Field FieldName="{@LaborTotal}"><FormattedValue>30.00</FormattedValue></Field>
          <Field FieldName="{@Total}"><FormattedValue>90.00</FormattedValue></Field>
        </Section>
      </GroupFooter>
    </Group>
  </Group>
</CrystalReport>"#;

    #[test]
    fn extracts_lines_with_vehicle_from_outer_group() {
        let lines = extract_invoices(SAMPLE).expect("should parse sample");
        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert_eq!(line.vehicle, "Vehicle: TRK1, ABC-123, 101");
            assert_eq!(line.truck, "TRK1");
            assert_eq!(line.license, "ABC-123");
            assert_eq!(line.unit, "101");
        }
    }

    #[test]
    fn sorts_by_date_within_vehicle() {
        let lines = extract_invoices(SAMPLE).expect("should parse sample");
        assert_eq!(lines[0].invoice, "1001");
        assert_eq!(lines[1].invoice, "1002");
        assert_eq!(lines[0].date, NaiveDate::from_ymd_opt(2025, 1, 5));
    }

    #[test]
    fn reads_amounts_and_defaults_missing_categories_to_zero() {
        let lines = extract_invoices(SAMPLE).expect("should parse sample");
        let first = &lines[0];
        assert_f64_eq(first.parts, 60.0);
        assert_f64_eq(first.labor, 30.0);
        assert_f64_eq(first.discount, 0.0);
        assert_f64_eq(first.haz_mat, 0.0);
        assert_f64_eq(first.supplies, 0.0);
        assert_f64_eq(first.total, 90.0);
    }

    #[test]
    fn lines_reconcile_with_total() {
        let lines = extract_invoices(SAMPLE).expect("should parse sample");
        assert!(lines.iter().all(InvoiceLine::reconciles));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let error = extract_invoices("<CrystalReport><Group>").expect_err("truncated xml should fail");
        assert!(error.to_string().contains("Failed to parse"));
    }

    #[test]
    fn document_without_invoices_is_empty() {
        let lines =
            extract_invoices(r#"<CrystalReport xmlns="urn:crystal-reports:schemas:report-detail"/>"#)
                .expect("should parse");
        assert!(lines.is_empty());
    }

    #[test]
    fn invoice_without_vehicle_group_gets_empty_vehicle() {
        let xml = r#"<CrystalReport>
  <Group>
    <Field FieldName="{@InvHdr}"><FormattedValue>Invoice: 5 Date: 02/01/2025</FormattedValue></Field>
    <Field FieldName="{@Total}"><FormattedValue>10.00</FormattedValue></Field>
  </Group>
</CrystalReport>"#;
        let lines = extract_invoices(xml).expect("should parse");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].vehicle, "");
        assert_eq!(lines[0].invoice, "5");
    }

    #[test]
    fn value_tag_used_when_formatted_value_missing() {
        let xml = r#"<CrystalReport>
  <Group>
    <Field FieldName="{@InvHdr}"><Value>Invoice: 7 Date: 02/02/2025</Value></Field>
    <Field FieldName="{@Total}"><Value>12.50</Value></Field>
  </Group>
</CrystalReport>"#;
        let lines = extract_invoices(xml).expect("should parse");
        assert_eq!(lines[0].invoice, "7");
        crate::assert_f64_eq(lines[0].total, 12.5);
    }
}

#[cfg(test)]
mod test_invoice_line {
    use super::*;

    fn line(vehicle: &str, date: Option<NaiveDate>, invoice: &str) -> InvoiceLine {
        InvoiceLine {
            invoice: invoice.to_string(),
            date,
            truck: String::new(),
            license: String::new(),
            unit: String::new(),
            vehicle: vehicle.to_string(),
            parts: 0.0,
            labor: 0.0,
            discount: 0.0,
            haz_mat: 0.0,
            supplies: 0.0,
            tax: 0.0,
            total: 0.0,
        }
    }

    #[test]
    fn ordering_is_vehicle_then_date_then_invoice() {
        let a = line("TRK1", NaiveDate::from_ymd_opt(2025, 1, 5), "2");
        let b = line("TRK1", NaiveDate::from_ymd_opt(2025, 1, 6), "1");
        let c = line("trk2", NaiveDate::from_ymd_opt(2025, 1, 1), "1");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn ordering_ignores_vehicle_case() {
        let a = line("trk1", None, "1");
        let b = line("TRK2", None, "1");
        assert!(a < b);
    }

    #[test]
    fn unknown_date_sorts_first() {
        let a = line("TRK1", None, "9");
        let b = line("TRK1", NaiveDate::from_ymd_opt(2025, 1, 1), "1");
        assert!(a < b);
    }

    #[test]
    fn date_text_empty_for_unknown_date() {
        assert_eq!(line("TRK1", None, "1").date_text(), "");
        assert_eq!(
            line("TRK1", NaiveDate::from_ymd_opt(2025, 1, 5), "1").date_text(),
            "2025-01-05"
        );
    }

    #[test]
    fn reconciles_within_half_a_cent() {
        let mut item = line("TRK1", None, "1");
        item.parts = 100.0;
        item.labor = 50.004;
        item.total = 150.0;
        assert!(item.reconciles());
        item.labor = 50.02;
        assert!(!item.reconciles());
    }

    #[test]
    fn display_contains_key_fields() {
        let mut item = line("Vehicle: TRK1, ABC-123", NaiveDate::from_ymd_opt(2025, 1, 5), "1001");
        item.total = 90.0;
        let text = format!("{item}");
        assert!(text.contains("2025-01-05"));
        assert!(text.contains("1001"));
        assert!(text.contains("TRK1"));
    }
}
