use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stockaudit_core::{DomainError, DomainResult, ProductId};
use stockaudit_inventory::{CountSnapshot, PurchaseLot, ReferenceLabel, closed_references, select_snapshot};
use stockaudit_valuation::{CountSnapshotReader, EntryLedgerReader, ProductCatalog, SourceError};

fn poisoned(what: &str) -> SourceError {
    SourceError::Unavailable(format!("{what} lock poisoned"))
}

/// In-memory entry ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: RwLock<Vec<PurchaseLot>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lots(lots: impl IntoIterator<Item = PurchaseLot>) -> Self {
        Self {
            inner: RwLock::new(lots.into_iter().collect()),
        }
    }

    pub fn record(&self, lot: PurchaseLot) -> Result<(), SourceError> {
        let mut lots = self.inner.write().map_err(|_| poisoned("ledger"))?;
        lots.push(lot);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntryLedgerReader for InMemoryLedger {
    fn fetch_lots_up_to(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseLot>, SourceError> {
        let lots = self.inner.read().map_err(|_| poisoned("ledger"))?;
        Ok(lots.iter().filter(|l| l.emitted_at <= cutoff).cloned().collect())
    }
}

/// In-memory count snapshot store, keyed by reference.
#[derive(Debug, Default)]
pub struct InMemoryCountStore {
    inner: RwLock<Vec<CountSnapshot>>,
}

impl InMemoryCountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the snapshot with the same reference.
    pub fn upsert(&self, snapshot: CountSnapshot) -> Result<(), SourceError> {
        let mut snaps = self.inner.write().map_err(|_| poisoned("count store"))?;
        match snaps.iter_mut().find(|s| s.reference == snapshot.reference) {
            Some(existing) => *existing = snapshot,
            None => snaps.push(snapshot),
        }
        Ok(())
    }

    /// Close an open count, fixing its cutoff.
    pub fn close_count(&self, reference: &ReferenceLabel, ended_at: DateTime<Utc>) -> DomainResult<()> {
        let mut snaps = self
            .inner
            .write()
            .map_err(|_| DomainError::invariant("count store lock poisoned"))?;

        let snapshot = snaps
            .iter_mut()
            .find(|s| s.reference == *reference)
            .ok_or_else(|| DomainError::not_found(format!("count {reference}")))?;

        if snapshot.is_closed() {
            return Err(DomainError::validation(format!("count {reference} is already closed")));
        }
        if ended_at < snapshot.count_started_at {
            return Err(DomainError::validation(format!(
                "count {reference} cannot end before it starts"
            )));
        }

        snapshot.count_ended_at = Some(ended_at);
        Ok(())
    }
}

impl CountSnapshotReader for InMemoryCountStore {
    fn fetch_count_snapshot(&self, reference: Option<&str>) -> Result<Option<CountSnapshot>, SourceError> {
        let snaps = self.inner.read().map_err(|_| poisoned("count store"))?;
        Ok(select_snapshot(&snaps, reference).cloned())
    }

    fn list_references(&self) -> Result<Vec<ReferenceLabel>, SourceError> {
        let snaps = self.inner.read().map_err(|_| poisoned("count store"))?;
        Ok(closed_references(&snaps))
    }
}

/// In-memory product catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<HashMap<ProductId, String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, product_id: ProductId, name: impl Into<String>) -> Result<(), SourceError> {
        let mut map = self.inner.write().map_err(|_| poisoned("catalog"))?;
        map.insert(product_id, name.into());
        Ok(())
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn resolve_product_name(&self, product_id: ProductId) -> Result<Option<String>, SourceError> {
        let map = self.inner.read().map_err(|_| poisoned("catalog"))?;
        Ok(map.get(&product_id).cloned())
    }

    fn resolve_product_names(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, String>, SourceError> {
        let map = self.inner.read().map_err(|_| poisoned("catalog"))?;
        Ok(product_ids
            .iter()
            .filter_map(|id| map.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
