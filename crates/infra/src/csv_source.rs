//! File-backed data source: CSV exports of the ledger, the counts and the
//! catalog, loaded into the in-memory stores.
//!
//! Expected files in the data directory (header row required):
//!
//! | file                  | columns                                                              | required |
//! |-----------------------|----------------------------------------------------------------------|----------|
//! | `products.csv`        | `id,name`                                                            | yes      |
//! | `snapshots.csv`       | `reference,count_started_at,count_ended_at`                          | yes      |
//! | `count_lines.csv`     | `reference,product_id,quantity`                                      | no       |
//! | `lots.csv`            | `sequence_id,product_id,emitted_at,quantity,unit_cost`               | no       |
//! | `invoice_lines.csv`   | `sequence_id,supplier_id,supplier_code,emitted_at,quantity,package_price` | no  |
//! | `supplier_links.csv`  | `supplier_id,supplier_code,product_id,units_per_package`             | with invoice lines |
//!
//! Timestamps are RFC 3339. An empty `count_ended_at` marks an open count.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use stockaudit_core::{DomainError, ProductId};
use stockaudit_inventory::{
    CountLine, CountSnapshot, InvoiceLine, PurchaseLot, ReferenceLabel, SupplierProductLink,
    lots_from_invoice_lines,
};
use stockaudit_valuation::{AuditService, SourceError};

use crate::read_model::{InMemoryCatalog, InMemoryCountStore, InMemoryLedger};

#[derive(Debug, Error)]
pub enum CsvSourceError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] SourceError),
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    id: ProductId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    reference: ReferenceLabel,
    count_started_at: DateTime<Utc>,
    count_ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CountLineRecord {
    reference: String,
    product_id: ProductId,
    quantity: f64,
}

/// The three collaborators, populated from a data directory.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    pub ledger: Arc<InMemoryLedger>,
    pub counts: Arc<InMemoryCountStore>,
    pub catalog: Arc<InMemoryCatalog>,
    /// Invoice lines skipped for lack of a supplier link.
    pub unmatched_invoice_lines: Vec<InvoiceLine>,
}

impl CsvDataSource {
    /// Load every file from `dir` using `delimiter` as field separator.
    pub fn load(dir: &Path, delimiter: u8) -> Result<Self, CsvSourceError> {
        let reader = CsvDir { dir, delimiter };

        let catalog = InMemoryCatalog::new();
        for p in reader.read::<ProductRecord>("products.csv", true)? {
            catalog.upsert(p.id, p.name)?;
        }

        let mut lines_by_reference: HashMap<String, Vec<CountLine>> = HashMap::new();
        for l in reader.read::<CountLineRecord>("count_lines.csv", false)? {
            lines_by_reference.entry(l.reference).or_default().push(CountLine {
                product_id: l.product_id,
                quantity: l.quantity,
            });
        }

        let counts = InMemoryCountStore::new();
        let mut references = HashSet::new();
        for s in reader.read::<SnapshotRecord>("snapshots.csv", true)? {
            if !references.insert(s.reference.clone()) {
                return Err(CsvSourceError::Invalid {
                    path: dir.join("snapshots.csv"),
                    message: format!("duplicate snapshot reference '{}'", s.reference),
                });
            }
            let lines = lines_by_reference.remove(s.reference.as_str()).unwrap_or_default();
            counts.upsert(CountSnapshot::from_lines(
                s.reference,
                s.count_started_at,
                s.count_ended_at,
                lines,
            )?)?;
        }
        if let Some(orphan) = lines_by_reference.keys().next() {
            return Err(CsvSourceError::Invalid {
                path: dir.join("count_lines.csv"),
                message: format!("count lines reference unknown snapshot '{orphan}'"),
            });
        }

        let ledger = InMemoryLedger::with_lots(reader.read::<PurchaseLot>("lots.csv", false)?);

        let invoice_lines = reader.read::<InvoiceLine>("invoice_lines.csv", false)?;
        let mut unmatched_invoice_lines = Vec::new();
        if !invoice_lines.is_empty() {
            let links = reader.read::<SupplierProductLink>("supplier_links.csv", true)?;
            let converted = lots_from_invoice_lines(invoice_lines, &links)?;
            for lot in converted.lots {
                ledger.record(lot)?;
            }
            unmatched_invoice_lines = converted.unmatched;
        }

        tracing::info!(
            dir = %dir.display(),
            lots = ledger.len(),
            unmatched_invoice_lines = unmatched_invoice_lines.len(),
            "loaded csv data source"
        );

        Ok(Self {
            ledger: Arc::new(ledger),
            counts: Arc::new(counts),
            catalog: Arc::new(catalog),
            unmatched_invoice_lines,
        })
    }

    /// Audit service reading from this source.
    pub fn audit_service(
        &self,
    ) -> AuditService<Arc<InMemoryLedger>, Arc<InMemoryCountStore>, Arc<InMemoryCatalog>> {
        AuditService::new(self.ledger.clone(), self.counts.clone(), self.catalog.clone())
    }
}

struct CsvDir<'a> {
    dir: &'a Path,
    delimiter: u8,
}

impl CsvDir<'_> {
    fn read<T: DeserializeOwned>(&self, name: &str, required: bool) -> Result<Vec<T>, CsvSourceError> {
        let path = self.dir.join(name);
        if !path.exists() {
            if required {
                return Err(CsvSourceError::Invalid {
                    path,
                    message: "required file is missing".to_string(),
                });
            }
            return Ok(Vec::new());
        }

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|source| CsvSourceError::Read {
                path: path.clone(),
                source,
            })?;

        rdr.deserialize()
            .collect::<Result<Vec<T>, csv::Error>>()
            .map_err(|source| CsvSourceError::Read { path, source })
    }
}
