//! Revoked session model
use crate::db::schema::revoked_sessions;
use chrono::NaiveDateTime;
use diesel::Insertable;

/// A session token that was ended before its expiry
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = revoked_sessions)]
pub struct NewRevokedSession {
    /// Unique id of the revoked token
    pub jti: String,
    /// The account the token was issued to
    pub account_id: i32,
    /// When the token would have expired on its own
    pub expires_at: NaiveDateTime,
}
