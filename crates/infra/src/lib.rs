//! Infrastructure layer: collaborator implementations, CSV IO, configuration.

pub mod config;
pub mod csv_source;
pub mod export;
pub mod read_model;

pub use config::AuditConfig;
pub use csv_source::{CsvDataSource, CsvSourceError};
pub use export::{ExportError, ExportOptions, export_csv};
pub use read_model::{InMemoryCatalog, InMemoryCountStore, InMemoryLedger};
