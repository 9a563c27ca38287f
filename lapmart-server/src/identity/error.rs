//! Failure modes of the identity workflow

use crate::error::AppError;
use http::StatusCode;
use lapmart_core::role::Role;
use validator::ValidationErrors;

/// Everything that can go wrong in signup, verification, login and sessions
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// A required field is missing or malformed
    #[error("{0}")]
    Validation(String),
    /// An account with this email already exists
    #[error("User already exists")]
    DuplicateAccount,
    /// No pending verification or account for this email
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The code doesn't match the one that was issued
    #[error("Invalid OTP")]
    InvalidCode,
    /// The code matches, but it is past its expiry
    #[error("OTP expired")]
    CodeExpired,
    /// Unknown purpose, or not the purpose the code was issued for
    #[error("Invalid purpose")]
    InvalidPurpose,
    /// Too many wrong codes, a new code has to be requested
    #[error("Too many failed attempts, request a new OTP")]
    TooManyAttempts,
    /// Login before the email address was verified
    #[error("Email not verified")]
    EmailUnverified,
    /// Wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Missing, malformed, expired or revoked session token
    #[error("Invalid or expired session token")]
    InvalidToken,
    /// The role of the session isn't allowed to perform the operation
    #[error("Role {0} may not perform this operation")]
    Forbidden(Role),
    /// The code was stored, but the email couldn't be delivered
    #[error("Could not deliver email: {0:#}")]
    Delivery(anyhow::Error),
    /// Persistence or other internal failure
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IdentityError {
    /// The HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateAccount
            | Self::InvalidCode
            | Self::CodeExpired
            | Self::InvalidPurpose
            | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::EmailUnverified | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::Delivery(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for IdentityError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Store(err) => AppError::from(err),
            err => AppError::new(err.status(), Some(err)),
        }
    }
}
