//! Entity trait: identity that survives changes to the record's values.

/// Entity marker + minimal interface.
///
/// Catalog records (ingredients) are entities: a formulation refers to them by
/// identifier, never by value.
pub trait Entity {
    /// Identifier type, unique within its collection.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
