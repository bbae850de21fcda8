//! Personalization scope.

use std::fmt;

/// Layer a piece of personalization data belongs to.
///
/// Shared data applies to every visitor of a page; user data overrides it
/// for a single visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PersonalizationScope {
    /// Per-visitor data.
    #[default]
    User,
    /// Site-wide data.
    Shared,
}

impl PersonalizationScope {
    /// Returns `true` for [`PersonalizationScope::Shared`].
    #[must_use]
    pub fn is_shared(self) -> bool {
        matches!(self, Self::Shared)
    }

    /// Returns `true` for [`PersonalizationScope::User`].
    #[must_use]
    pub fn is_user(self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for PersonalizationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Shared => f.write_str("shared"),
        }
    }
}
