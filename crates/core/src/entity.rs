//! Entity identity.

/// A domain entity: a stable identity that outlives any field value.
///
/// Parts, transactions, reservations, and alerts all implement this; stores
/// and engines key collections and lock registries by `Id`.
pub trait Entity {
    /// Strongly-typed identifier (a small `Copy` UUID newtype).
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
