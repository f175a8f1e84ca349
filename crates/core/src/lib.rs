//! `stockaudit-core`: shared building blocks for the audit engine.
//!
//! This crate contains **pure domain** primitives (no IO, no storage).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, SequenceId, SupplierId};
pub use value_object::ValueObject;
