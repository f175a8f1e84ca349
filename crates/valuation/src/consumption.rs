//! Consumption Resolver: how much of each layer has left the shelf.
//!
//! Nothing records individual issues; consumption is inferred as
//! `total_entries - counted_quantity` and assigned to layers oldest first.

use serde::{Deserialize, Serialize};

use crate::error::AnomalyWarning;
use crate::layers::CostLayer;

/// Consumed/remaining split of one layer.
///
/// Invariant: `quantity_consumed + quantity_remaining == layer.quantity` and
/// `0 <= quantity_consumed <= layer.quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub quantity_consumed: f64,
    pub quantity_remaining: f64,
}

/// Consumption of one product's layers.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionOutcome {
    /// One record per layer, same order as the layers.
    pub records: Vec<ConsumptionRecord>,
    pub total_entries: f64,
    pub counted_quantity: f64,
    /// Issued quantity after clamping to `[0, total_entries]`.
    pub total_issued: f64,
    pub anomaly: Option<AnomalyWarning>,
}

impl ConsumptionOutcome {
    pub fn quantity_consumed(&self) -> f64 {
        self.records.iter().map(|r| r.quantity_consumed).sum()
    }
}

/// Resolve FIFO consumption for one product's layers, already sorted by
/// `(emitted_at, sequence_id)`.
///
/// A count above recorded entries clamps issues to zero and yields an
/// [`AnomalyWarning`]; issues can never exceed entries either.
pub fn resolve_consumption(layers: &[CostLayer], counted_quantity: f64) -> ConsumptionOutcome {
    // The last running sum is the product's total entries; using it (instead of
    // a fresh sum) keeps the full-consumption comparison below exact.
    let total_entries = layers.last().map_or(0.0, |l| l.cumulative_quantity);
    let raw_issued = total_entries - counted_quantity;

    let anomaly = match layers.first() {
        Some(first) if raw_issued < 0.0 => {
            let warning = AnomalyWarning {
                product_id: first.product_id,
                total_entries,
                counted_quantity,
            };
            tracing::warn!(
                product_id = %first.product_id,
                total_entries,
                counted_quantity,
                "count exceeds recorded entries; consumption clamped to zero"
            );
            Some(warning)
        }
        _ => None,
    };

    // Same as `clamp(0.0, total_entries)` but total on NaN input.
    let total_issued = raw_issued.max(0.0).min(total_entries);

    let mut prior_cumulative = 0.0;
    let records = layers
        .iter()
        .map(|layer| {
            let quantity_consumed = if total_issued >= layer.cumulative_quantity {
                layer.quantity
            } else if total_issued > prior_cumulative {
                // Straddles the boundary; bounded for float noise in the running sums.
                (total_issued - prior_cumulative).min(layer.quantity)
            } else {
                0.0
            };
            prior_cumulative = layer.cumulative_quantity;

            ConsumptionRecord {
                quantity_consumed,
                quantity_remaining: layer.quantity - quantity_consumed,
            }
        })
        .collect();

    ConsumptionOutcome {
        records,
        total_entries,
        counted_quantity,
        total_issued,
        anomaly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::build_layers;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use stockaudit_core::{ProductId, SequenceId};
    use stockaudit_inventory::PurchaseLot;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 0, 0, 0).unwrap()
    }

    fn layers_of(lots: &[(u32, f64, f64)]) -> Vec<CostLayer> {
        let lots: Vec<PurchaseLot> = lots
            .iter()
            .enumerate()
            .map(|(i, (m, q, c))| {
                PurchaseLot::new(ProductId::new(1), at(*m, 1), *q, *c, SequenceId::new(i as u64))
            })
            .collect();
        build_layers(&lots, at(12, 31))
            .unwrap()
            .remove(&ProductId::new(1))
            .unwrap_or_default()
    }

    #[test]
    fn partial_boundary_layer() {
        let layers = layers_of(&[(1, 10.0, 2.0), (2, 5.0, 2.2)]);
        let out = resolve_consumption(&layers, 3.0);

        assert_eq!(out.total_issued, 12.0);
        assert_eq!(out.records[0].quantity_consumed, 10.0);
        assert_eq!(out.records[0].quantity_remaining, 0.0);
        assert_eq!(out.records[1].quantity_consumed, 2.0);
        assert_eq!(out.records[1].quantity_remaining, 3.0);
        assert!(out.anomaly.is_none());
    }

    #[test]
    fn count_above_entries_clamps_and_warns() {
        let layers = layers_of(&[(1, 2.0, 1.0), (2, 3.0, 1.0)]);
        let out = resolve_consumption(&layers, 8.0);

        assert_eq!(out.total_issued, 0.0);
        assert!(out.records.iter().all(|r| r.quantity_consumed == 0.0));
        assert_eq!(out.records[1].quantity_remaining, 3.0);

        let warning = out.anomaly.unwrap();
        assert_eq!(warning.product_id, ProductId::new(1));
        assert_eq!(warning.excess(), 3.0);
    }

    #[test]
    fn exact_boundary_consumes_whole_layer() {
        let layers = layers_of(&[(1, 10.0, 1.0)]);
        let out = resolve_consumption(&layers, 0.0);

        assert_eq!(out.total_issued, 10.0);
        assert_eq!(out.records[0].quantity_consumed, 10.0);
        assert_eq!(out.records[0].quantity_remaining, 0.0);
    }

    #[test]
    fn boundary_between_layers_leaves_next_untouched() {
        let layers = layers_of(&[(1, 4.0, 1.0), (2, 6.0, 1.0)]);
        let out = resolve_consumption(&layers, 6.0);

        assert_eq!(out.records[0].quantity_consumed, 4.0);
        assert_eq!(out.records[1].quantity_consumed, 0.0);
        assert_eq!(out.records[1].quantity_remaining, 6.0);
    }

    #[test]
    fn negative_count_clamps_to_entries() {
        let layers = layers_of(&[(1, 4.0, 1.0)]);
        let out = resolve_consumption(&layers, -2.0);

        assert_eq!(out.total_issued, 4.0);
        assert!(out.anomaly.is_none());
    }

    #[test]
    fn no_layers_no_records() {
        let out = resolve_consumption(&[], 5.0);
        assert!(out.records.is_empty());
        assert_eq!(out.total_issued, 0.0);
        assert!(out.anomaly.is_none());
    }

    #[test]
    fn non_finite_running_sum_does_not_panic() {
        let mut layers = layers_of(&[(1, 10.0, 1.0)]);
        layers[0].cumulative_quantity = f64::NAN;

        let out = resolve_consumption(&layers, 0.0);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.total_issued, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: consumed + remaining reconstructs every layer, and total
        /// consumption equals the clamped issue quantity.
        #[test]
        fn reconciles_for_any_count(
            lots in prop::collection::vec((1u32..=12, 0.001f64..1_000.0, 0.0f64..100.0), 1..30),
            counted in 0.0f64..20_000.0
        ) {
            let layers = layers_of(&lots);
            let out = resolve_consumption(&layers, counted);

            let entries: f64 = layers.iter().map(|l| l.quantity).sum();
            let tol = 1e-6 * entries.max(1.0);

            for (layer, rec) in layers.iter().zip(&out.records) {
                prop_assert!(rec.quantity_consumed >= 0.0);
                prop_assert!(rec.quantity_consumed <= layer.quantity);
                prop_assert!((rec.quantity_consumed + rec.quantity_remaining - layer.quantity).abs() <= tol);
            }

            let expected = (entries - counted).clamp(0.0, entries);
            prop_assert!((out.quantity_consumed() - expected).abs() <= tol);
            prop_assert_eq!(out.anomaly.is_some(), counted > out.total_entries);
        }
    }
}
