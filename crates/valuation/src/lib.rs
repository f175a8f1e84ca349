//! FIFO (PEPS) inventory valuation and audit engine.
//!
//! Given the purchase lots of each product and a closed physical count, the
//! engine reconstructs how much of every lot was consumed and how much is still
//! on hand, valuing both at the lot's acquisition cost.
//!
//! Pipeline (each stage is a pure function over the previous one):
//! - [`layers::build_layers`]: lots → ordered cost layers with running sums
//! - [`consumption::resolve_consumption`]: layers + count → consumed/remaining
//! - [`valuation::value`]: quantities → money
//! - [`service::AuditService`]: reads the collaborators and assembles the report
//!
//! The engine holds no state between calls; every report is recomputed from the
//! readers.

pub mod consumption;
pub mod error;
pub mod layers;
pub mod readers;
pub mod report;
pub mod service;
pub mod valuation;

pub use consumption::{ConsumptionOutcome, ConsumptionRecord, resolve_consumption};
pub use error::{AnomalyWarning, AuditError, SourceError};
pub use layers::{CostLayer, build_layers};
pub use readers::{CountSnapshotReader, EntryLedgerReader, ProductCatalog};
pub use report::{AuditFilter, AuditReport, AuditRow, AuditTotals, ProductSummary, totals_of};
pub use service::AuditService;
pub use valuation::{CompensatedSum, LayerValuation, value};

/// Absolute tolerance used when checking the reconciliation identities.
pub const RECONCILIATION_TOLERANCE: f64 = 1e-6;
