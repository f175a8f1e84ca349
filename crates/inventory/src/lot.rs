use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockaudit_core::{ProductId, SequenceId, ValueObject};

/// One purchase lot as recorded by the entry ledger.
///
/// `quantity` is expressed in stock units and `unit_cost` is the acquisition
/// cost of one unit. Validation (positive quantity, non-negative cost) happens
/// when lots are layered, so a bad row fails the whole report instead of being
/// dropped at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLot {
    pub product_id: ProductId,
    pub emitted_at: DateTime<Utc>,
    pub quantity: f64,
    pub unit_cost: f64,
    /// Tie-break for lots sharing `emitted_at`.
    pub sequence_id: SequenceId,
}

impl ValueObject for PurchaseLot {}

impl PurchaseLot {
    pub fn new(
        product_id: ProductId,
        emitted_at: DateTime<Utc>,
        quantity: f64,
        unit_cost: f64,
        sequence_id: SequenceId,
    ) -> Self {
        Self {
            product_id,
            emitted_at,
            quantity,
            unit_cost,
            sequence_id,
        }
    }

    /// FIFO ordering key within a product.
    pub fn chronological_key(&self) -> (DateTime<Utc>, SequenceId) {
        (self.emitted_at, self.sequence_id)
    }

    /// Acquisition value of the whole lot.
    pub fn total_cost(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}
