//! Signed session tokens

use super::IdentityError;
use crate::settings;
use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lapmart_core::role::{Operation, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    /// Role of the account when the token was issued
    pub role: Role,
    /// Unique token id, the handle for revocation
    pub jti: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// An authenticated session, as presented in a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The account this session belongs to
    pub account_id: i32,
    /// Role of the account
    pub role: Role,
    /// Unique token id
    pub jti: String,
    /// When the token stops being accepted
    pub expires_at: NaiveDateTime,
}

impl Session {
    /// Fail unless the role of this session is on the allow-list of `operation`
    pub fn require(&self, operation: Operation) -> Result<(), IdentityError> {
        if self.role.may(operation) {
            Ok(())
        } else {
            tracing::warn!(account_id = self.account_id, role = %self.role, ?operation, "Operation denied");
            Err(IdentityError::Forbidden(self.role))
        }
    }
}

impl TryFrom<Claims> for Session {
    type Error = IdentityError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let account_id = claims
            .sub
            .parse()
            .map_err(|_| IdentityError::InvalidToken)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .map(|at| at.naive_utc())
            .ok_or(IdentityError::InvalidToken)?;

        Ok(Self {
            account_id,
            role: claims.role,
            jti: claims.jti,
            expires_at,
        })
    }
}

/// HS256 keys for issuing and checking session tokens
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    /// Keys derived from the configured secret
    pub fn new(settings: &settings::Session) -> Self {
        Self::from_secret(settings.secret.as_bytes(), settings.ttl())
    }

    /// Keys for a raw secret and token lifetime
    pub fn from_secret(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 30;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Sign a fresh token for an account
    pub fn issue(&self, account_id: i32, role: Role) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and expiry of a token
    pub fn verify(&self, token: &str) -> Result<Session, IdentityError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            IdentityError::InvalidToken
        })?;

        Session::try_from(data.claims)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish()
    }
}
