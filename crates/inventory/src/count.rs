//! Physical count snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockaudit_core::{DomainError, DomainResult, ProductId};

use crate::reference::ReferenceLabel;

/// One counted line of a stock take. A product may be counted on several
/// lines (different shelves, different people); lines are summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountLine {
    pub product_id: ProductId,
    pub quantity: f64,
}

/// A physical count at the end of a period.
///
/// While `count_ended_at` is `None` the count is still open and has no cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSnapshot {
    pub reference: ReferenceLabel,
    pub count_started_at: DateTime<Utc>,
    pub count_ended_at: Option<DateTime<Utc>>,
    pub counted_quantity_by_product: BTreeMap<ProductId, f64>,
}

impl CountSnapshot {
    /// Build a snapshot from raw count lines, summing per product.
    pub fn from_lines(
        reference: ReferenceLabel,
        count_started_at: DateTime<Utc>,
        count_ended_at: Option<DateTime<Utc>>,
        lines: impl IntoIterator<Item = CountLine>,
    ) -> DomainResult<Self> {
        if let Some(ended) = count_ended_at {
            if ended < count_started_at {
                return Err(DomainError::validation(format!(
                    "count {reference} ends before it starts"
                )));
            }
        }

        let mut counted: BTreeMap<ProductId, f64> = BTreeMap::new();
        for line in lines {
            if !line.quantity.is_finite() || line.quantity < 0.0 {
                return Err(DomainError::validation(format!(
                    "count {reference}: product {} has invalid quantity {}",
                    line.product_id, line.quantity
                )));
            }
            *counted.entry(line.product_id).or_insert(0.0) += line.quantity;
        }

        Ok(Self {
            reference,
            count_started_at,
            count_ended_at,
            counted_quantity_by_product: counted,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.count_ended_at.is_some()
    }

    /// Cutoff for eligible lots; `None` while the count is open.
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.count_ended_at
    }

    /// Counted quantity for a product; products not counted are zero.
    pub fn counted_quantity(&self, product_id: ProductId) -> f64 {
        self.counted_quantity_by_product
            .get(&product_id)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Resolve a snapshot the way the count reader is expected to:
/// - `Some(reference)`: the snapshot with that label, open or closed.
/// - `None`: the closed snapshot with the latest `count_ended_at`.
pub fn select_snapshot<'a>(
    snapshots: &'a [CountSnapshot],
    reference: Option<&str>,
) -> Option<&'a CountSnapshot> {
    match reference {
        Some(r) => snapshots.iter().find(|s| s.reference == *r),
        None => snapshots
            .iter()
            .filter(|s| s.is_closed())
            .max_by(|a, b| closed_order(a, b)),
    }
}

/// Labels of closed snapshots, newest cutoff first.
pub fn closed_references(snapshots: &[CountSnapshot]) -> Vec<ReferenceLabel> {
    let mut closed: Vec<&CountSnapshot> = snapshots.iter().filter(|s| s.is_closed()).collect();
    closed.sort_by(|a, b| closed_order(b, a));
    closed.into_iter().map(|s| s.reference.clone()).collect()
}

fn closed_order(a: &CountSnapshot, b: &CountSnapshot) -> core::cmp::Ordering {
    (a.count_ended_at, a.reference.period()).cmp(&(b.count_ended_at, b.reference.period()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn snapshot(reference: &str, ended: Option<DateTime<Utc>>) -> CountSnapshot {
        CountSnapshot::from_lines(reference.parse().unwrap(), at(2024, 1, 1), ended, vec![]).unwrap()
    }

    #[test]
    fn sums_lines_per_product() {
        let p = ProductId::new(7);
        let snap = CountSnapshot::from_lines(
            "03/2024".parse().unwrap(),
            at(2024, 3, 30),
            Some(at(2024, 3, 31)),
            vec![
                CountLine { product_id: p, quantity: 2.5 },
                CountLine { product_id: p, quantity: 1.5 },
            ],
        )
        .unwrap();

        assert_eq!(snap.counted_quantity(p), 4.0);
        assert_eq!(snap.counted_quantity(ProductId::new(8)), 0.0);
    }

    #[test]
    fn rejects_negative_count() {
        let err = CountSnapshot::from_lines(
            "03/2024".parse().unwrap(),
            at(2024, 3, 30),
            None,
            vec![CountLine { product_id: ProductId::new(1), quantity: -1.0 }],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn latest_closed_snapshot_wins() {
        let snaps = vec![
            snapshot("01/2024", Some(at(2024, 1, 31))),
            snapshot("03/2024", None),
            snapshot("02/2024", Some(at(2024, 2, 29))),
        ];

        let latest = select_snapshot(&snaps, None).unwrap();
        assert_eq!(latest.reference.as_str(), "02/2024");

        let open = select_snapshot(&snaps, Some("03/2024")).unwrap();
        assert!(!open.is_closed());

        assert!(select_snapshot(&snaps, Some("09/2024")).is_none());
    }

    #[test]
    fn closed_references_are_newest_first() {
        let snaps = vec![
            snapshot("01/2024", Some(at(2024, 1, 31))),
            snapshot("03/2024", None),
            snapshot("02/2024", Some(at(2024, 2, 29))),
        ];

        let refs: Vec<String> = closed_references(&snaps).into_iter().map(String::from).collect();
        assert_eq!(refs, vec!["02/2024", "01/2024"]);
    }
}
