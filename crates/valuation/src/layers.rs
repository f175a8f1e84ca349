//! Layer Builder: purchase lots → FIFO cost layers.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockaudit_core::{ProductId, SequenceId, ValueObject};
use stockaudit_inventory::PurchaseLot;

use crate::error::AuditError;
use crate::valuation::CompensatedSum;

/// One purchase lot placed in its product's FIFO order.
///
/// `cumulative_quantity` is the running sum of `quantity` over this layer and
/// every earlier layer of the same product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLayer {
    pub product_id: ProductId,
    pub emitted_at: DateTime<Utc>,
    pub sequence_id: SequenceId,
    pub quantity: f64,
    pub unit_cost: f64,
    pub cumulative_quantity: f64,
}

impl ValueObject for CostLayer {}

/// Build ordered cost layers per product from lots emitted up to `cutoff`.
///
/// Lots after the cutoff are ignored. Eligible lots must have a positive,
/// finite quantity and a non-negative, finite unit cost, and a
/// `(product_id, sequence_id)` pair may appear only once. Layers are sorted by
/// `(emitted_at, sequence_id)` regardless of input order.
pub fn build_layers(
    lots: &[PurchaseLot],
    cutoff: DateTime<Utc>,
) -> Result<BTreeMap<ProductId, Vec<CostLayer>>, AuditError> {
    let mut grouped: BTreeMap<ProductId, Vec<&PurchaseLot>> = BTreeMap::new();
    let mut seen: HashSet<(ProductId, SequenceId)> = HashSet::new();

    for lot in lots.iter().filter(|l| l.emitted_at <= cutoff) {
        validate_lot(lot)?;
        if !seen.insert((lot.product_id, lot.sequence_id)) {
            return Err(integrity(lot, "duplicate sequence_id for product"));
        }
        grouped.entry(lot.product_id).or_default().push(lot);
    }

    let mut layers = BTreeMap::new();
    for (product_id, mut group) in grouped {
        group.sort_by_key(|l| l.chronological_key());

        let mut running = CompensatedSum::new();
        let mut product_layers = Vec::with_capacity(group.len());
        for lot in group {
            running.add(lot.quantity);
            let cumulative_quantity = running.value();
            // Each lot is finite on its own; their sum may not be.
            if !cumulative_quantity.is_finite() {
                return Err(integrity(lot, "cumulative quantity overflows"));
            }
            product_layers.push(CostLayer {
                product_id,
                emitted_at: lot.emitted_at,
                sequence_id: lot.sequence_id,
                quantity: lot.quantity,
                unit_cost: lot.unit_cost,
                cumulative_quantity,
            });
        }

        tracing::debug!(%product_id, layers = product_layers.len(), "built cost layers");
        layers.insert(product_id, product_layers);
    }

    Ok(layers)
}

fn validate_lot(lot: &PurchaseLot) -> Result<(), AuditError> {
    if !lot.quantity.is_finite() || lot.quantity <= 0.0 {
        return Err(integrity(lot, format!("quantity must be positive (got {})", lot.quantity)));
    }
    if !lot.unit_cost.is_finite() || lot.unit_cost < 0.0 {
        return Err(integrity(
            lot,
            format!("unit cost must be non-negative (got {})", lot.unit_cost),
        ));
    }
    Ok(())
}

fn integrity(lot: &PurchaseLot, reason: impl Into<String>) -> AuditError {
    AuditError::DataIntegrity {
        product_id: lot.product_id,
        sequence_id: lot.sequence_id,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn lot(product: u64, d: u32, quantity: f64, cost: f64, seq: u64) -> PurchaseLot {
        PurchaseLot::new(ProductId::new(product), day(d), quantity, cost, SequenceId::new(seq))
    }

    #[test]
    fn groups_sorts_and_accumulates() {
        let lots = vec![
            lot(2, 5, 1.0, 1.0, 4),
            lot(1, 3, 5.0, 2.2, 2),
            lot(1, 1, 10.0, 2.0, 1),
        ];

        let layers = build_layers(&lots, day(31)).unwrap();
        assert_eq!(layers.len(), 2);

        let p1 = &layers[&ProductId::new(1)];
        assert_eq!(p1[0].emitted_at, day(1));
        assert_eq!(p1[0].cumulative_quantity, 10.0);
        assert_eq!(p1[1].cumulative_quantity, 15.0);
    }

    #[test]
    fn rejects_cumulative_overflow() {
        let lots = vec![lot(1, 1, 1e308, 1.0, 1), lot(1, 2, 1e308, 1.0, 2)];

        match build_layers(&lots, day(31)) {
            Err(AuditError::DataIntegrity {
                product_id,
                sequence_id,
                reason,
            }) => {
                assert_eq!(product_id, ProductId::new(1));
                assert_eq!(sequence_id, SequenceId::new(2));
                assert!(reason.contains("overflows"));
            }
            other => panic!("expected overflow to be rejected, got {other:?}"),
        }
    }

    #[test]
    fn drops_lots_after_cutoff() {
        let lots = vec![lot(1, 1, 10.0, 2.0, 1), lot(1, 20, 5.0, 2.0, 2)];
        let layers = build_layers(&lots, day(10)).unwrap();
        assert_eq!(layers[&ProductId::new(1)].len(), 1);
    }

    #[test]
    fn lot_on_cutoff_instant_is_included() {
        let lots = vec![lot(1, 10, 4.0, 1.0, 1)];
        let layers = build_layers(&lots, day(10)).unwrap();
        assert_eq!(layers[&ProductId::new(1)].len(), 1);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let err = build_layers(&[lot(1, 1, 0.0, 2.0, 9)], day(31)).unwrap_err();
        match err {
            AuditError::DataIntegrity { sequence_id, .. } => assert_eq!(sequence_id, SequenceId::new(9)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_cost() {
        let err = build_layers(&[lot(1, 1, 3.0, -0.01, 1)], day(31)).unwrap_err();
        assert!(matches!(err, AuditError::DataIntegrity { .. }));
    }

    #[test]
    fn invalid_lot_after_cutoff_is_not_considered() {
        let lots = vec![lot(1, 1, 3.0, 1.0, 1), lot(1, 20, -5.0, 1.0, 2)];
        assert!(build_layers(&lots, day(10)).is_ok());
    }

    #[test]
    fn rejects_duplicate_sequence_within_product() {
        let lots = vec![lot(1, 1, 3.0, 1.0, 1), lot(1, 2, 3.0, 1.0, 1)];
        assert!(matches!(
            build_layers(&lots, day(31)),
            Err(AuditError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn zero_cost_lot_is_valid() {
        let layers = build_layers(&[lot(1, 1, 3.0, 0.0, 1)], day(31)).unwrap();
        assert_eq!(layers[&ProductId::new(1)][0].unit_cost, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: running sums never decrease and end at the product's total.
        #[test]
        fn cumulative_quantity_is_monotonic(
            quantities in prop::collection::vec(0.001f64..10_000.0, 1..40)
        ) {
            let lots: Vec<PurchaseLot> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| lot(1, 1 + (i as u32 % 28), *q, 1.0, i as u64))
                .collect();

            let layers = build_layers(&lots, day(31)).unwrap();
            let p = &layers[&ProductId::new(1)];

            for pair in p.windows(2) {
                prop_assert!(pair[1].cumulative_quantity >= pair[0].cumulative_quantity);
            }

            let total: f64 = quantities.iter().sum();
            let last = p.last().unwrap().cumulative_quantity;
            prop_assert!((last - total).abs() <= 1e-6 * total.max(1.0));
        }

        /// Property: lots sharing a timestamp always come out in sequence order,
        /// whatever order they were supplied in.
        #[test]
        fn ties_resolve_by_sequence(
            seqs in prop::collection::hash_set(0u64..1_000, 2..20),
            shuffle_seed in any::<u64>()
        ) {
            let mut lots: Vec<PurchaseLot> = seqs
                .iter()
                .map(|s| lot(1, 15, 1.0 + *s as f64, 1.0, *s))
                .collect();

            // Deterministic permutation driven by the seed.
            let n = lots.len();
            let mut state = shuffle_seed;
            for i in (1..n).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                lots.swap(i, j);
            }

            let layers = build_layers(&lots, day(31)).unwrap();
            let order: Vec<u64> = layers[&ProductId::new(1)].iter().map(|l| l.sequence_id.get()).collect();

            let mut expected: Vec<u64> = seqs.into_iter().collect();
            expected.sort_unstable();
            prop_assert_eq!(order, expected);
        }
    }
}
