//! Collaborator interfaces the engine reads from.
//!
//! They are passed into [`crate::AuditService`] explicitly; the engine never
//! reaches for a global session or connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use stockaudit_core::ProductId;
use stockaudit_inventory::{CountSnapshot, PurchaseLot, ReferenceLabel};

use crate::error::SourceError;

/// Supplies purchase lots.
pub trait EntryLedgerReader: Send + Sync {
    /// All lots with `emitted_at <= cutoff`, any order.
    fn fetch_lots_up_to(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseLot>, SourceError>;
}

/// Supplies physical count snapshots.
pub trait CountSnapshotReader: Send + Sync {
    /// `Some(reference)` resolves that label (open or closed); `None` resolves
    /// the most recently closed snapshot. `Ok(None)` when nothing matches.
    fn fetch_count_snapshot(&self, reference: Option<&str>) -> Result<Option<CountSnapshot>, SourceError>;

    /// Labels of closed snapshots, newest first.
    fn list_references(&self) -> Result<Vec<ReferenceLabel>, SourceError>;
}

/// Maps product ids to display names.
pub trait ProductCatalog: Send + Sync {
    fn resolve_product_name(&self, product_id: ProductId) -> Result<Option<String>, SourceError>;

    /// Batch lookup; ids without an entry are absent from the result.
    ///
    /// The default issues one lookup per id; stores that can do better should
    /// override it.
    fn resolve_product_names(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, String>, SourceError> {
        let mut names = HashMap::with_capacity(product_ids.len());
        for id in product_ids {
            if let Some(name) = self.resolve_product_name(*id)? {
                names.insert(*id, name);
            }
        }
        Ok(names)
    }
}

impl<S> EntryLedgerReader for Arc<S>
where
    S: EntryLedgerReader + ?Sized,
{
    fn fetch_lots_up_to(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseLot>, SourceError> {
        (**self).fetch_lots_up_to(cutoff)
    }
}

impl<S> CountSnapshotReader for Arc<S>
where
    S: CountSnapshotReader + ?Sized,
{
    fn fetch_count_snapshot(&self, reference: Option<&str>) -> Result<Option<CountSnapshot>, SourceError> {
        (**self).fetch_count_snapshot(reference)
    }

    fn list_references(&self) -> Result<Vec<ReferenceLabel>, SourceError> {
        (**self).list_references()
    }
}

impl<S> ProductCatalog for Arc<S>
where
    S: ProductCatalog + ?Sized,
{
    fn resolve_product_name(&self, product_id: ProductId) -> Result<Option<String>, SourceError> {
        (**self).resolve_product_name(product_id)
    }

    fn resolve_product_names(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, String>, SourceError> {
        (**self).resolve_product_names(product_ids)
    }
}
