//! Supplier invoice lines and their conversion into purchase lots.
//!
//! Suppliers invoice in their own packaging ("box of 12") under their own
//! product codes. A [`SupplierProductLink`] maps a supplier code onto a catalog
//! product and says how many stock units one package holds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockaudit_core::{DomainError, DomainResult, ProductId, SequenceId, SupplierId};

use crate::lot::PurchaseLot;

/// One line of a captured supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub sequence_id: SequenceId,
    pub supplier_id: SupplierId,
    pub supplier_code: String,
    pub emitted_at: DateTime<Utc>,
    /// Packages invoiced.
    pub quantity: f64,
    /// Price of one package.
    pub package_price: f64,
}

/// Association between a supplier's product code and a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierProductLink {
    pub supplier_id: SupplierId,
    pub supplier_code: String,
    pub product_id: ProductId,
    pub units_per_package: f64,
}

/// Result of converting invoice lines: the lots plus the lines that had no
/// product link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotConversion {
    pub lots: Vec<PurchaseLot>,
    pub unmatched: Vec<InvoiceLine>,
}

/// Convert invoice lines into purchase lots expressed in stock units.
///
/// `quantity = packages * units_per_package` and
/// `unit_cost = package_price / units_per_package`, so the lot value equals the
/// invoiced amount. Lines whose `(supplier_id, supplier_code)` has no link are
/// returned in `unmatched` rather than guessed.
pub fn lots_from_invoice_lines(
    lines: impl IntoIterator<Item = InvoiceLine>,
    links: &[SupplierProductLink],
) -> DomainResult<LotConversion> {
    let mut index: HashMap<(SupplierId, &str), &SupplierProductLink> = HashMap::new();
    for link in links {
        if !(link.units_per_package.is_finite() && link.units_per_package > 0.0) {
            return Err(DomainError::validation(format!(
                "supplier {} code '{}': units_per_package must be positive",
                link.supplier_id, link.supplier_code
            )));
        }
        index.insert((link.supplier_id, link.supplier_code.as_str()), link);
    }

    let mut out = LotConversion::default();
    for line in lines {
        let linked = index
            .get(&(line.supplier_id, line.supplier_code.as_str()))
            .map(|link| (link.product_id, link.units_per_package));

        match linked {
            Some((product_id, units_per_package)) => out.lots.push(PurchaseLot {
                product_id,
                emitted_at: line.emitted_at,
                quantity: line.quantity * units_per_package,
                unit_cost: line.package_price / units_per_package,
                sequence_id: line.sequence_id,
            }),
            None => {
                tracing::warn!(
                    supplier_id = %line.supplier_id,
                    supplier_code = %line.supplier_code,
                    sequence_id = %line.sequence_id,
                    "invoice line has no product link; skipped"
                );
                out.unmatched.push(line);
            }
        }
    }

    Ok(out)
}
