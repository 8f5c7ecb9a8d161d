//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity; two with the same attributes are equal
/// (e.g. `Money`, `StockLevel`). They are immutable: "modifying" one means
/// producing a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
