//! Tabular export of audit rows.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use stockaudit_valuation::{AuditRow, totals_of};

use crate::config::AuditConfig;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column names, in [`ExportRecord`] field order.
const HEADER: [&str; 12] = [
    "product_id",
    "product_name",
    "layer_date",
    "quantity",
    "unit_cost",
    "quantity_consumed",
    "quantity_remaining",
    "value_consumed",
    "value_remaining",
    "value_total",
    "cutoff",
    "anomaly",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    pub utf8_bom: bool,
    pub include_totals: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            utf8_bom: true,
            include_totals: true,
        }
    }
}

impl From<&AuditConfig> for ExportOptions {
    fn from(cfg: &AuditConfig) -> Self {
        Self {
            delimiter: cfg.export_delimiter(),
            utf8_bom: cfg.export.utf8_bom,
            include_totals: cfg.export.include_totals,
        }
    }
}

/// One exported line. Column order is the report's field order; the totals
/// line leaves identifying columns empty.
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    product_id: Option<u64>,
    product_name: &'a str,
    layer_date: Option<DateTime<Utc>>,
    quantity: f64,
    unit_cost: Option<f64>,
    quantity_consumed: f64,
    quantity_remaining: f64,
    value_consumed: f64,
    value_remaining: f64,
    value_total: f64,
    cutoff: Option<DateTime<Utc>>,
    anomaly: &'a str,
}

impl<'a> From<&'a AuditRow> for ExportRecord<'a> {
    fn from(row: &'a AuditRow) -> Self {
        Self {
            product_id: Some(row.product_id.get()),
            product_name: &row.product_name,
            layer_date: Some(row.layer_date),
            quantity: row.quantity,
            unit_cost: Some(row.unit_cost),
            quantity_consumed: row.quantity_consumed,
            quantity_remaining: row.quantity_remaining,
            value_consumed: row.value_consumed,
            value_remaining: row.value_remaining,
            value_total: row.value_total,
            cutoff: Some(row.cutoff),
            anomaly: if row.anomaly.is_some() { "count_exceeds_entries" } else { "" },
        }
    }
}

/// Write `rows` as CSV to `writer`. Returns the number of data rows written
/// (the totals line is not counted).
pub fn export_csv<'a, W: Write>(
    rows: impl IntoIterator<Item = &'a AuditRow>,
    mut writer: W,
    options: &ExportOptions,
) -> Result<usize, ExportError> {
    if options.utf8_bom {
        writer.write_all(UTF8_BOM)?;
    }

    let rows: Vec<&AuditRow> = rows.into_iter().collect();

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADER)?;

    for row in &rows {
        wtr.serialize(ExportRecord::from(*row))?;
    }

    if options.include_totals {
        let t = totals_of(rows.iter().copied());
        wtr.serialize(ExportRecord {
            product_id: None,
            product_name: "Total",
            layer_date: None,
            quantity: t.quantity,
            unit_cost: None,
            quantity_consumed: t.quantity_consumed,
            quantity_remaining: t.quantity_remaining,
            value_consumed: t.value_consumed,
            value_remaining: t.value_remaining,
            value_total: t.value_total,
            cutoff: None,
            anomaly: "",
        })?;
    }

    wtr.flush()?;
    Ok(rows.len())
}
