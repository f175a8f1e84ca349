//! Value object trait: equality by value, not identity.
//!
//! Lots, layers and report rows are all values: recomputed on every request,
//! never mutated in place, and compared field by field.

/// Marker trait for value objects.
///
/// The trait requires:
/// - **Clone**: values are copied freely between pipeline stages
/// - **PartialEq**: compared by their attribute values
/// - **Debug**: shows up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
