//! Account roles and the operations each role may invoke

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Coarse authorization tier of an account.
///
/// Accounts created through signup are always [`Role::User`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A regular marketplace customer
    #[default]
    User,
    /// Owns a shop and manages its listings
    Owner,
    /// Manages owners and shops
    Admin,
    /// Manages admins
    Superadmin,
}

impl Role {
    /// All roles, lowest tier first
    pub const ALL: [Role; 4] = [Role::User, Role::Owner, Role::Admin, Role::Superadmin];

    /// The canonical string form of this role, as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Superadmin => "SUPERADMIN",
        }
    }

    /// Whether this role is on the allow-list of `operation`
    pub fn may(&self, operation: Operation) -> bool {
        operation.allowed_roles().contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string doesn't name a known [`Role`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// An authenticated operation.
///
/// Each operation carries an explicit allow-list of roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Read the account behind the current session
    ViewOwnAccount,
    /// Change bio or avatar of the account behind the current session
    UpdateOwnProfile,
    /// Revoke the current session
    EndSession,
}

impl Operation {
    /// Roles that may invoke this operation
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::ViewOwnAccount | Self::UpdateOwnProfile | Self::EndSession => &Role::ALL,
        }
    }
}
