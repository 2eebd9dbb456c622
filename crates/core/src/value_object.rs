//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity; two instances with the same attribute
/// values are interchangeable. Nutritional targets are the typical example:
/// a target of 16% protein at ±1 is the same target wherever it came from.
///
/// Implementors are expected to be immutable once constructed. To "change" a
/// value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
