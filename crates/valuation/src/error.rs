use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockaudit_core::{ProductId, SequenceId};

/// Failure reported by a collaborator (ledger, count store, catalog).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record in data source: {0}")]
    Malformed(String),
}

/// Errors that abort report generation.
///
/// A partial, unreconciled report is worse than none, so every variant here
/// stops the whole request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuditError {
    #[error("data integrity violation in lot {sequence_id} of product {product_id}: {reason}")]
    DataIntegrity {
        product_id: ProductId,
        sequence_id: SequenceId,
        reason: String,
    },

    #[error("count snapshot not found: {0}")]
    ReferenceNotFound(String),

    #[error("count snapshot {0} is still open and has no cutoff")]
    CountStillOpen(String),

    #[error("product {0} is referenced by a lot but has no catalog entry")]
    ProductNotFound(ProductId),

    #[error("reconciliation failed for product {product_id}: {detail}")]
    Reconciliation { product_id: ProductId, detail: String },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Non-fatal: the count reports more stock than was ever recorded as entering.
///
/// Usually a miscount or a missing invoice. Consumption is clamped to zero and
/// the warning travels with every row of the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyWarning {
    pub product_id: ProductId,
    pub total_entries: f64,
    pub counted_quantity: f64,
}

impl AnomalyWarning {
    /// Counted quantity not covered by recorded entries.
    pub fn excess(&self) -> f64 {
        self.counted_quantity - self.total_entries
    }
}

impl core::fmt::Display for AnomalyWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "product {} counted {:.3} but entries total {:.3} (excess {:.3})",
            self.product_id,
            self.counted_quantity,
            self.total_entries,
            self.excess()
        )
    }
}
