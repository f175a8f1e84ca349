//! Audit report rows, per-product summaries and totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockaudit_core::{ProductId, SequenceId, ValueObject};
use stockaudit_inventory::ReferenceLabel;

use crate::error::AnomalyWarning;
use crate::valuation::CompensatedSum;

/// One cost layer of one product, fully resolved and valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub layer_date: DateTime<Utc>,
    pub sequence_id: SequenceId,
    pub quantity: f64,
    pub unit_cost: f64,
    pub cumulative_quantity: f64,
    /// Product-level issued quantity (same on every row of the product).
    pub total_issued: f64,
    pub quantity_consumed: f64,
    pub quantity_remaining: f64,
    pub value_consumed: f64,
    pub value_remaining: f64,
    pub value_total: f64,
    pub cutoff: DateTime<Utc>,
    pub anomaly: Option<AnomalyWarning>,
}

impl ValueObject for AuditRow {}

/// Sums over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTotals {
    pub quantity: f64,
    pub quantity_consumed: f64,
    pub quantity_remaining: f64,
    pub value_total: f64,
    pub value_consumed: f64,
    pub value_remaining: f64,
}

/// Totals of `rows`, accumulated in the order given.
pub fn totals_of<'a>(rows: impl IntoIterator<Item = &'a AuditRow>) -> AuditTotals {
    let mut quantity = CompensatedSum::new();
    let mut consumed = CompensatedSum::new();
    let mut remaining = CompensatedSum::new();
    let mut value_total = CompensatedSum::new();
    let mut value_consumed = CompensatedSum::new();
    let mut value_remaining = CompensatedSum::new();

    for row in rows {
        quantity.add(row.quantity);
        consumed.add(row.quantity_consumed);
        remaining.add(row.quantity_remaining);
        value_total.add(row.value_total);
        value_consumed.add(row.value_consumed);
        value_remaining.add(row.value_remaining);
    }

    AuditTotals {
        quantity: quantity.value(),
        quantity_consumed: consumed.value(),
        quantity_remaining: remaining.value(),
        value_total: value_total.value(),
        value_consumed: value_consumed.value(),
        value_remaining: value_remaining.value(),
    }
}

/// Product-level view of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub product_name: String,
    pub layers: usize,
    pub total_entries: f64,
    pub counted_quantity: f64,
    pub total_issued: f64,
    pub totals: AuditTotals,
    pub anomaly: Option<AnomalyWarning>,
}

/// Presentation filter over a report.
///
/// By default rows whose remaining quantity is zero are hidden; `show_all`
/// keeps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub product_name: Option<String>,
    pub show_all: bool,
}

impl AuditFilter {
    pub fn all() -> Self {
        Self {
            product_name: None,
            show_all: true,
        }
    }

    pub fn for_product(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn matches(&self, row: &AuditRow) -> bool {
        if let Some(name) = &self.product_name {
            if row.product_name != *name {
                return false;
            }
        }
        self.show_all || row.quantity_remaining != 0.0
    }
}

/// Result of one audit request.
///
/// Rows are ordered by `(product_id, layer_date, sequence_id)`. Iterating is
/// repeatable; a fresh report requires a new `generate_audit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub reference: ReferenceLabel,
    pub cutoff: DateTime<Utc>,
    pub rows: Vec<AuditRow>,
    pub products: Vec<ProductSummary>,
    pub warnings: Vec<AnomalyWarning>,
}

impl AuditReport {
    pub fn rows(&self) -> impl Iterator<Item = &AuditRow> + '_ {
        self.rows.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn totals(&self) -> AuditTotals {
        totals_of(&self.rows)
    }

    pub fn product(&self, product_id: ProductId) -> Option<&ProductSummary> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    /// Rows selected by `filter`, in report order.
    ///
    /// The filter is copied, so the rows outlive a temporary filter.
    pub fn view<'a>(&'a self, filter: &AuditFilter) -> impl Iterator<Item = &'a AuditRow> + use<'a> {
        let filter = filter.clone();
        self.rows.iter().filter(move |row| filter.matches(row))
    }

    /// Distinct product names, sorted; feeds product selectors.
    pub fn product_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.products.iter().map(|p| p.product_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn into_rows(self) -> Vec<AuditRow> {
        self.rows
    }
}

impl IntoIterator for AuditReport {
    type Item = AuditRow;
    type IntoIter = std::vec::IntoIter<AuditRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a AuditReport {
    type Item = &'a AuditRow;
    type IntoIter = std::slice::Iter<'a, AuditRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(product: u64, name: &str, remaining: f64) -> AuditRow {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AuditRow {
            product_id: ProductId::new(product),
            product_name: name.to_string(),
            layer_date: at,
            sequence_id: SequenceId::new(1),
            quantity: 10.0,
            unit_cost: 1.5,
            cumulative_quantity: 10.0,
            total_issued: 10.0 - remaining,
            quantity_consumed: 10.0 - remaining,
            quantity_remaining: remaining,
            value_consumed: (10.0 - remaining) * 1.5,
            value_remaining: remaining * 1.5,
            value_total: 15.0,
            cutoff: at,
            anomaly: None,
        }
    }

    #[test]
    fn default_filter_hides_exhausted_layers() {
        let rows = [row(1, "Coffee", 0.0), row(1, "Coffee", 4.0)];
        let filter = AuditFilter::default();

        let shown: Vec<_> = rows.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].quantity_remaining, 4.0);

        assert!(rows.iter().all(|r| AuditFilter::all().matches(r)));
    }

    #[test]
    fn product_filter_matches_exact_name() {
        let filter = AuditFilter::all().for_product("Sugar");
        assert!(filter.matches(&row(2, "Sugar", 0.0)));
        assert!(!filter.matches(&row(1, "Coffee", 3.0)));
    }

    #[test]
    fn totals_add_up_rows() {
        let rows = [row(1, "Coffee", 0.0), row(2, "Sugar", 4.0)];
        let t = totals_of(&rows);

        assert_eq!(t.quantity, 20.0);
        assert_eq!(t.quantity_consumed, 16.0);
        assert_eq!(t.quantity_remaining, 4.0);
        assert_eq!(t.value_total, 30.0);
        assert_eq!(t.value_consumed + t.value_remaining, t.value_total);
    }

    #[test]
    fn view_rows_outlive_a_temporary_filter() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let report = AuditReport {
            reference: "01/2024".parse().unwrap(),
            cutoff: at,
            rows: vec![row(1, "Coffee", 0.0), row(1, "Coffee", 4.0), row(2, "Tea", 1.0)],
            products: vec![],
            warnings: vec![],
        };

        let shown: Vec<&AuditRow> = report.view(&AuditFilter::default()).collect();
        assert_eq!(shown.len(), 2);

        let tea: Vec<&AuditRow> = report.view(&AuditFilter::all().for_product("Tea")).collect();
        assert_eq!(tea.len(), 1);
        assert_eq!(tea[0].product_id, ProductId::new(2));
    }
}
