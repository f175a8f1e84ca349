//! Audit Report Assembler.

use stockaudit_core::ProductId;
use stockaudit_inventory::ReferenceLabel;
use tracing::instrument;

use crate::RECONCILIATION_TOLERANCE;
use crate::consumption::{ConsumptionOutcome, resolve_consumption};
use crate::error::AuditError;
use crate::layers::{CostLayer, build_layers};
use crate::readers::{CountSnapshotReader, EntryLedgerReader, ProductCatalog};
use crate::report::{AuditReport, AuditRow, ProductSummary, totals_of};
use crate::valuation::value;

/// Stateless FIFO audit over three injected collaborators.
///
/// Safe to share between threads and call concurrently: each call reads its
/// own snapshot of lots and counts and keeps nothing afterwards.
#[derive(Debug, Clone)]
pub struct AuditService<L, C, P> {
    ledger: L,
    counts: C,
    catalog: P,
}

impl<L, C, P> AuditService<L, C, P>
where
    L: EntryLedgerReader,
    C: CountSnapshotReader,
    P: ProductCatalog,
{
    pub fn new(ledger: L, counts: C, catalog: P) -> Self {
        Self {
            ledger,
            counts,
            catalog,
        }
    }

    /// References available for auditing, newest first.
    pub fn list_available_references(&self) -> Result<Vec<ReferenceLabel>, AuditError> {
        Ok(self.counts.list_references()?)
    }

    /// Build the FIFO audit for `reference`, or for the latest closed count.
    ///
    /// Fails as a whole on unknown or open references, invalid lots, products
    /// missing from the catalog, or a layer set that does not reconcile.
    #[instrument(skip(self, reference), fields(reference = reference.unwrap_or("<latest>")), err)]
    pub fn generate_audit(&self, reference: Option<&str>) -> Result<AuditReport, AuditError> {
        let snapshot = self
            .counts
            .fetch_count_snapshot(reference)?
            .ok_or_else(|| {
                AuditError::ReferenceNotFound(
                    reference.map_or_else(|| "no closed count available".to_string(), str::to_string),
                )
            })?;

        let cutoff = snapshot
            .cutoff()
            .ok_or_else(|| AuditError::CountStillOpen(snapshot.reference.to_string()))?;

        let lots = self.ledger.fetch_lots_up_to(cutoff)?;
        let layers = build_layers(&lots, cutoff)?;

        let product_ids: Vec<ProductId> = layers.keys().copied().collect();
        let names = self.catalog.resolve_product_names(&product_ids)?;
        if let Some(missing) = product_ids.iter().find(|id| !names.contains_key(*id)) {
            return Err(AuditError::ProductNotFound(*missing));
        }

        let mut rows = Vec::with_capacity(lots.len());
        let mut products = Vec::with_capacity(layers.len());
        let mut warnings = Vec::new();

        for (product_id, product_layers) in &layers {
            let product_name = names.get(product_id).cloned().unwrap_or_default();
            let outcome = resolve_consumption(product_layers, snapshot.counted_quantity(*product_id));
            check_reconciliation(*product_id, product_layers, &outcome)?;

            let first_row = rows.len();
            for (layer, record) in product_layers.iter().zip(&outcome.records) {
                let valuation = value(layer, record);
                rows.push(AuditRow {
                    product_id: *product_id,
                    product_name: product_name.clone(),
                    layer_date: layer.emitted_at,
                    sequence_id: layer.sequence_id,
                    quantity: layer.quantity,
                    unit_cost: layer.unit_cost,
                    cumulative_quantity: layer.cumulative_quantity,
                    total_issued: outcome.total_issued,
                    quantity_consumed: record.quantity_consumed,
                    quantity_remaining: record.quantity_remaining,
                    value_consumed: valuation.value_consumed,
                    value_remaining: valuation.value_remaining,
                    value_total: valuation.value_total,
                    cutoff,
                    anomaly: outcome.anomaly.clone(),
                });
            }

            products.push(ProductSummary {
                product_id: *product_id,
                product_name,
                layers: product_layers.len(),
                total_entries: outcome.total_entries,
                counted_quantity: outcome.counted_quantity,
                total_issued: outcome.total_issued,
                totals: totals_of(&rows[first_row..]),
                anomaly: outcome.anomaly.clone(),
            });

            if let Some(warning) = outcome.anomaly {
                warnings.push(warning);
            }
        }

        let report = AuditReport {
            reference: snapshot.reference,
            cutoff,
            rows,
            products,
            warnings,
        };

        let totals = report.totals();
        tracing::info!(
            reference = %report.reference,
            %cutoff,
            products = report.products.len(),
            rows = report.rows.len(),
            anomalies = report.warnings.len(),
            value_consumed = totals.value_consumed,
            value_remaining = totals.value_remaining,
            "audit generated"
        );

        Ok(report)
    }
}

fn check_reconciliation(
    product_id: ProductId,
    layers: &[CostLayer],
    outcome: &ConsumptionOutcome,
) -> Result<(), AuditError> {
    let tolerance = RECONCILIATION_TOLERANCE * outcome.total_entries.max(1.0);

    let consumed = outcome.quantity_consumed();
    if (consumed - outcome.total_issued).abs() > tolerance {
        return Err(AuditError::Reconciliation {
            product_id,
            detail: format!(
                "consumed {consumed} does not match issued {}",
                outcome.total_issued
            ),
        });
    }

    for (layer, record) in layers.iter().zip(&outcome.records) {
        let split = record.quantity_consumed + record.quantity_remaining;
        if record.quantity_consumed < 0.0 || (split - layer.quantity).abs() > tolerance {
            return Err(AuditError::Reconciliation {
                product_id,
                detail: format!(
                    "layer {} splits into {} + {} but holds {}",
                    layer.sequence_id, record.quantity_consumed, record.quantity_remaining, layer.quantity
                ),
            });
        }
    }

    Ok(())
}
