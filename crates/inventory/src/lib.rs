//! Inventory input model.
//!
//! Purchase lots recorded by the entry ledger and physical count snapshots.
//! Everything here is read-only data handed to the valuation engine; no IO.

pub mod count;
pub mod invoice;
pub mod lot;
pub mod reference;

pub use count::{CountLine, CountSnapshot, closed_references, select_snapshot};
pub use invoice::{InvoiceLine, LotConversion, SupplierProductLink, lots_from_invoice_lines};
pub use lot::PurchaseLot;
pub use reference::ReferenceLabel;
