//! Aggregate invoice lines into per-vehicle totals.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::extract::InvoiceLine;
use crate::round_currency;

/// One aggregate row per distinct (vehicle, unit) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedTotal {
    pub vehicle: String,
    pub unit: String,
    pub invoices: u64,
    pub parts: f64,
    pub labor: f64,
    pub discount: f64,
    pub haz_mat: f64,
    pub supplies: f64,
    pub tax: f64,
    pub total: f64,
}

impl GroupedTotal {
    /// Sum of the cost-category columns, which should reconcile with `total`.
    #[must_use]
    pub fn category_sum(&self) -> f64 {
        self.parts + self.labor + self.discount + self.haz_mat + self.supplies + self.tax
    }

    /// Whether the summed categories reconcile with the summed total,
    /// allowing half a cent of source-report rounding per invoice.
    #[must_use]
    pub fn reconciles(&self) -> bool {
        (self.category_sum() - self.total).abs() <= 0.005 * self.invoices as f64 + 1e-9
    }

    fn add(&mut self, line: &InvoiceLine) {
        self.invoices += 1;
        self.parts += line.parts;
        self.labor += line.labor;
        self.discount += line.discount;
        self.haz_mat += line.haz_mat;
        self.supplies += line.supplies;
        self.tax += line.tax;
        self.total += line.total;
    }
}

impl Serialize for GroupedTotal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("GroupedTotal", 10)?;

        state.serialize_field("vehicle", &self.vehicle)?;
        state.serialize_field("Unit", &self.unit)?;
        state.serialize_field("quantity of invoices", &self.invoices)?;
        state.serialize_field("Parts", &round_currency(self.parts))?;
        state.serialize_field("Labor", &round_currency(self.labor))?;
        state.serialize_field("Discount", &round_currency(self.discount))?;
        state.serialize_field("Haz Mat", &round_currency(self.haz_mat))?;
        state.serialize_field("Supplies", &round_currency(self.supplies))?;
        state.serialize_field("Tax", &round_currency(self.tax))?;
        state.serialize_field("Total", &round_currency(self.total))?;

        state.end()
    }
}

/// Group invoice lines by (vehicle, unit), in first-seen order.
/// Lines with an empty vehicle string land in an `Unknown` group.
#[must_use]
pub fn group_by_vehicle(lines: &[InvoiceLine]) -> Vec<GroupedTotal> {
    let mut groups: Vec<GroupedTotal> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let vehicle = match line.vehicle.trim() {
            "" => "Unknown".to_string(),
            trimmed => trimmed.to_string(),
        };
        let key = (vehicle, line.unit.trim().to_string());

        if let Some(&position) = index.get(&key) {
            groups[position].add(line);
        } else {
            let mut group = GroupedTotal {
                vehicle: key.0.clone(),
                unit: key.1.clone(),
                ..GroupedTotal::default()
            };
            group.add(line);
            index.insert(key, groups.len());
            groups.push(group);
        }
    }

    groups
}

/// Sort aggregate rows by total, descending. This is the order the grouped
/// spreadsheet and the bar chart use.
#[must_use]
pub fn sorted_by_total_desc(mut groups: Vec<GroupedTotal>) -> Vec<GroupedTotal> {
    groups.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    groups
}
