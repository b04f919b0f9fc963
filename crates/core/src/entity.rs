//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// An entity is defined by its identifier, not its attributes: two values
/// with the same id describe the same entity even when every other field
/// differs. Implementors that also implement `PartialEq`/`Hash` must derive
/// both from the identifier alone so the two notions of sameness agree.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
