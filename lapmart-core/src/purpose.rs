//! What a one-time code was issued for

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// The flow a one-time code belongs to.
///
/// Serialized as `VERIFY_EMAIL` / `RESET_PASSWORD`, both on the wire and in
/// the `purpose` column of pending verifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationPurpose {
    /// Proves control of the email address given at signup
    VerifyEmail,
    /// Authorizes overwriting the password of an existing account
    ResetPassword,
}

impl VerificationPurpose {
    /// The canonical string form of this purpose
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerifyEmail => "VERIFY_EMAIL",
            Self::ResetPassword => "RESET_PASSWORD",
        }
    }
}

impl std::fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string doesn't name a known [`VerificationPurpose`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid purpose: {0:?}")]
pub struct InvalidPurpose(pub String);

impl FromStr for VerificationPurpose {
    type Err = InvalidPurpose;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VERIFY_EMAIL" => Ok(Self::VerifyEmail),
            "RESET_PASSWORD" => Ok(Self::ResetPassword),
            other => Err(InvalidPurpose(other.to_string())),
        }
    }
}
