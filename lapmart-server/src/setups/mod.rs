//! This abstracts lapmart server side-effects into "setups".
//!
//! This module defines the traits, submodules define test & production
//! collections of implementations.
use crate::models::{
    account::{AccountRecord, NewAccount},
    pending_verification::{NewPendingVerification, PendingVerification},
    revoked_session::NewRevokedSession,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use lapmart_core::purpose::VerificationPurpose;

pub mod local;
pub mod prod;

/// This trait groups type parameters to the server's `AppState` struct.
///
/// It captures the setup of the server, distinguishing between e.g.
/// unit testing & production setups.
pub trait ServerSetup: Clone + Send + Sync + 'static {
    /// Where accounts, pending verifications and revoked sessions live
    type Store: IdentityStore;
    /// Which implementation to use to deliver one-time codes
    type NotificationSender: NotificationSender;
}

/// Persistence of accounts, pending verifications and revoked sessions.
///
/// Every method is atomic per record. Races between requests for the same
/// email are settled here, never by in-process locks.
#[async_trait]
pub trait IdentityStore: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Look up an account by its normalized email
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>>;

    /// Look up an account by id
    async fn find_account_by_id(&self, id: i32) -> Result<Option<AccountRecord>>;

    /// Replace the bio
    async fn update_bio(&self, id: i32, bio: &str) -> Result<Option<AccountRecord>>;

    /// Replace the avatar reference
    async fn update_image(
        &self,
        id: i32,
        image_url: &str,
        image_public_id: &str,
    ) -> Result<Option<AccountRecord>>;

    /// Insert a pending verification, replacing any record for the same email
    async fn upsert_pending(&self, record: &NewPendingVerification)
        -> Result<PendingVerification>;

    /// Look up the pending verification of an email
    async fn find_pending(&self, email: &str) -> Result<Option<PendingVerification>>;

    /// Swap in a fresh code and expiry, and reset the attempt counter.
    ///
    /// Only applies if a record with this email and purpose still exists.
    async fn reissue_code(
        &self,
        email: &str,
        purpose: VerificationPurpose,
        code: &str,
        expires_at: NaiveDateTime,
    ) -> Result<Option<PendingVerification>>;

    /// Compare `code` against the pending verification of `email`.
    ///
    /// A wrong code is counted in the same atomic step that rejects it, and
    /// only while fewer than `max_attempts` were counted. Concurrent wrong
    /// guesses can never push more than `max_attempts` comparisons through.
    async fn check_code(&self, email: &str, code: &str, max_attempts: i32) -> Result<CodeCheck>;

    /// Spend a signup code and create the staged account, atomically.
    ///
    /// The pending verification is only consumed if it still holds `code` and
    /// is not locked. Exactly one of several concurrent callers gets past
    /// [SignupRedemption::Spent]. If the account insert fails, the pending
    /// verification is kept.
    async fn redeem_signup(
        &self,
        email: &str,
        code: &str,
        max_attempts: i32,
        account: &NewAccount,
    ) -> Result<SignupRedemption>;

    /// Spend a reset code and replace the password hash, atomically.
    async fn redeem_reset(
        &self,
        email: &str,
        code: &str,
        max_attempts: i32,
        password_hash: &str,
    ) -> Result<ResetRedemption>;

    /// Remember a session token as revoked until it expires
    async fn revoke_session(&self, session: &NewRevokedSession) -> Result<()>;

    /// Whether the token with this id was revoked
    async fn is_session_revoked(&self, jti: &str) -> Result<bool>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;
}

/// Outcome of [IdentityStore::check_code]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeCheck {
    /// No pending verification for this email
    Missing,
    /// The attempt limit is reached, the code is not compared
    Locked,
    /// Wrong code. `attempts` is the counter after this guess.
    Mismatch {
        /// Failed attempts counted so far
        attempts: i32,
    },
    /// The code matches. Nothing was changed.
    Matched(PendingVerification),
}

/// Outcome of [IdentityStore::redeem_signup]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupRedemption {
    /// The code was consumed by someone else, replaced or locked meanwhile
    Spent,
    /// The account was created
    Created(AccountRecord),
    /// The code was consumed, but an account with this email already existed
    Existing(AccountRecord),
}

/// Outcome of [IdentityStore::redeem_reset]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRedemption {
    /// The code was consumed by someone else, replaced or locked meanwhile
    Spent,
    /// The password hash was replaced
    Reset,
    /// The code was consumed, but no account has this email
    UnknownAccount,
}

/// The service that delivers one-time codes
#[async_trait]
pub trait NotificationSender: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Deliver an html message to `to`
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}
