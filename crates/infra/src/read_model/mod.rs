//! In-memory collaborator stores for tests, demos and file-backed sources.

pub mod in_memory;

pub use in_memory::{InMemoryCatalog, InMemoryCountStore, InMemoryLedger};
