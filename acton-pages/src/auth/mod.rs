//! Actor identity for page access checks
//!
//! Authentication and session management live outside the engine. Callers
//! resolve the user themselves and hand the router an [`Actor`]; the only
//! policy applied here is whether a page requires an authenticated actor.
//!
//! ```rust
//! use acton_pages::auth::{Actor, Principal};
//!
//! let guest = Actor::Anonymous;
//! assert!(!guest.is_authenticated());
//!
//! let user = Actor::Authenticated(Principal::new(7, "ada"));
//! assert_eq!(user.principal().map(|p| p.id), Some(7));
//! ```

use serde::{Deserialize, Serialize};

/// Authenticated user as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id
    pub id: i64,
    /// Login or display name
    pub name: String,
}

impl Principal {
    /// Create a principal
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Who is navigating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// No authenticated user
    #[default]
    Anonymous,
    /// Authenticated user
    Authenticated(Principal),
}

impl Actor {
    /// Whether the actor is an authenticated user
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The authenticated user, if any
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Anonymous => None,
        }
    }
}

impl From<Option<Principal>> for Actor {
    fn from(principal: Option<Principal>) -> Self {
        principal.map_or(Self::Anonymous, Self::Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor_is_anonymous() {
        assert_eq!(Actor::default(), Actor::Anonymous);
        assert!(Actor::default().principal().is_none());
    }

    #[test]
    fn test_from_optional_principal() {
        let actor = Actor::from(Some(Principal::new(1, "grace")));
        assert!(actor.is_authenticated());
        assert!(!Actor::from(None).is_authenticated());
    }
}
