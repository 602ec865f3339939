//! Entity traits: identity + ownership.

use crate::id::ManagerId;

/// Entity marker + minimal interface.
///
/// Identities are assigned by the persistence layer, so an entity that has not been
/// saved yet has no id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier, if one has been assigned.
    fn id(&self) -> Option<Self::Id>;

    /// Whether the entity has been persisted (has an identity).
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}

/// A record owned by exactly one store manager (the tenant boundary).
pub trait ManagerScoped {
    fn manager_id(&self) -> ManagerId;
}
