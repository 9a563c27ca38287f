//! PostgreSQL implementation of [IdentityStore]

use crate::{
    db::{
        connect,
        schema::{accounts, pending_verifications, revoked_sessions},
        Pool,
    },
    models::{
        account::{AccountRecord, NewAccount},
        pending_verification::{NewPendingVerification, PendingVerification},
        revoked_session::NewRevokedSession,
    },
    setups::{CodeCheck, IdentityStore, ResetRedemption, SignupRedemption},
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::{
    dsl::{exists, now},
    ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use lapmart_core::purpose::VerificationPurpose;

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Wrap a connection pool
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool", &self.pool.state())
            .finish()
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        let mut conn = connect(&self.pool).await?;

        Ok(accounts::table
            .filter(accounts::email.eq(email))
            .select(AccountRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn find_account_by_id(&self, id: i32) -> Result<Option<AccountRecord>> {
        let mut conn = connect(&self.pool).await?;

        Ok(accounts::table
            .find(id)
            .select(AccountRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn update_bio(&self, id: i32, bio: &str) -> Result<Option<AccountRecord>> {
        let mut conn = connect(&self.pool).await?;

        Ok(diesel::update(accounts::table.find(id))
            .set((accounts::bio.eq(bio), accounts::updated_at.eq(now)))
            .returning(AccountRecord::as_select())
            .get_result(&mut conn)
            .await
            .optional()?)
    }

    async fn update_image(
        &self,
        id: i32,
        image_url: &str,
        image_public_id: &str,
    ) -> Result<Option<AccountRecord>> {
        let mut conn = connect(&self.pool).await?;

        Ok(diesel::update(accounts::table.find(id))
            .set((
                accounts::image_url.eq(image_url),
                accounts::image_public_id.eq(image_public_id),
                accounts::updated_at.eq(now),
            ))
            .returning(AccountRecord::as_select())
            .get_result(&mut conn)
            .await
            .optional()?)
    }

    async fn upsert_pending(
        &self,
        record: &NewPendingVerification,
    ) -> Result<PendingVerification> {
        let mut conn = connect(&self.pool).await?;

        tracing::debug!(
            email = %record.email,
            purpose = %record.purpose,
            "Upserting pending verification"
        );

        Ok(diesel::insert_into(pending_verifications::table)
            .values(record)
            .on_conflict(pending_verifications::email)
            .do_update()
            .set(record)
            .returning(PendingVerification::as_select())
            .get_result(&mut conn)
            .await?)
    }

    async fn find_pending(&self, email: &str) -> Result<Option<PendingVerification>> {
        let mut conn = connect(&self.pool).await?;

        Ok(pending_verifications::table
            .find(email)
            .select(PendingVerification::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn reissue_code(
        &self,
        email: &str,
        purpose: VerificationPurpose,
        code: &str,
        expires_at: NaiveDateTime,
    ) -> Result<Option<PendingVerification>> {
        let mut conn = connect(&self.pool).await?;

        Ok(diesel::update(
            pending_verifications::table
                .filter(pending_verifications::email.eq(email))
                .filter(pending_verifications::purpose.eq(purpose.as_str())),
        )
        .set((
            pending_verifications::code.eq(code),
            pending_verifications::expires_at.eq(expires_at),
            pending_verifications::attempts.eq(0),
            pending_verifications::updated_at.eq(now),
        ))
        .returning(PendingVerification::as_select())
        .get_result(&mut conn)
        .await
        .optional()?)
    }

    async fn check_code(&self, email: &str, code: &str, max_attempts: i32) -> Result<CodeCheck> {
        let mut conn = connect(&self.pool).await?;

        // Rejecting and counting a wrong code is a single row update, so
        // concurrent guesses serialize on the row lock.
        let counted = diesel::update(
            pending_verifications::table
                .filter(pending_verifications::email.eq(email))
                .filter(pending_verifications::attempts.lt(max_attempts))
                .filter(pending_verifications::code.ne(code)),
        )
        .set(pending_verifications::attempts.eq(pending_verifications::attempts + 1))
        .returning(pending_verifications::attempts)
        .get_result::<i32>(&mut conn)
        .await
        .optional()?;

        if let Some(attempts) = counted {
            return Ok(CodeCheck::Mismatch { attempts });
        }

        let pending = pending_verifications::table
            .find(email)
            .select(PendingVerification::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(match pending {
            None => CodeCheck::Missing,
            Some(pending) if pending.attempts >= max_attempts => CodeCheck::Locked,
            // Replaced by a resend in between, not counted against the new code
            Some(pending) if pending.code != code => CodeCheck::Mismatch {
                attempts: pending.attempts,
            },
            Some(pending) => CodeCheck::Matched(pending),
        })
    }

    async fn redeem_signup(
        &self,
        email: &str,
        code: &str,
        max_attempts: i32,
        account: &NewAccount,
    ) -> Result<SignupRedemption> {
        let mut conn = connect(&self.pool).await?;

        tracing::debug!(email, "Redeeming signup code");

        let redemption = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    if !consume(conn, email, code, max_attempts).await? {
                        return Ok(SignupRedemption::Spent);
                    }

                    let created = diesel::insert_into(accounts::table)
                        .values(account)
                        .on_conflict(accounts::email)
                        .do_nothing()
                        .returning(AccountRecord::as_select())
                        .get_result(conn)
                        .await
                        .optional()?;

                    if let Some(created) = created {
                        return Ok(SignupRedemption::Created(created));
                    }

                    let existing = accounts::table
                        .filter(accounts::email.eq(email))
                        .select(AccountRecord::as_select())
                        .first(conn)
                        .await?;

                    Ok(SignupRedemption::Existing(existing))
                }
                .scope_boxed()
            })
            .await?;

        Ok(redemption)
    }

    async fn redeem_reset(
        &self,
        email: &str,
        code: &str,
        max_attempts: i32,
        password_hash: &str,
    ) -> Result<ResetRedemption> {
        let mut conn = connect(&self.pool).await?;

        tracing::debug!(email, "Redeeming reset code");

        let redemption = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    if !consume(conn, email, code, max_attempts).await? {
                        return Ok(ResetRedemption::Spent);
                    }

                    let updated =
                        diesel::update(accounts::table.filter(accounts::email.eq(email)))
                            .set((
                                accounts::password_hash.eq(password_hash),
                                accounts::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .await?;

                    Ok(if updated > 0 {
                        ResetRedemption::Reset
                    } else {
                        ResetRedemption::UnknownAccount
                    })
                }
                .scope_boxed()
            })
            .await?;

        Ok(redemption)
    }

    async fn revoke_session(&self, session: &NewRevokedSession) -> Result<()> {
        let mut conn = connect(&self.pool).await?;

        let pruned =
            diesel::delete(revoked_sessions::table.filter(revoked_sessions::expires_at.lt(now)))
                .execute(&mut conn)
                .await?;

        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired session revocations");
        }

        diesel::insert_into(revoked_sessions::table)
            .values(session)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn is_session_revoked(&self, jti: &str) -> Result<bool> {
        let mut conn = connect(&self.pool).await?;

        Ok(diesel::select(exists(revoked_sessions::table.find(jti)))
            .get_result::<bool>(&mut conn)
            .await?)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = connect(&self.pool).await?;

        diesel::sql_query("SELECT 1").execute(&mut conn).await?;

        Ok(())
    }
}

/// Delete the pending verification if it still holds `code` and is not locked
async fn consume(
    conn: &mut AsyncPgConnection,
    email: &str,
    code: &str,
    max_attempts: i32,
) -> Result<bool, diesel::result::Error> {
    let deleted = diesel::delete(
        pending_verifications::table
            .filter(pending_verifications::email.eq(email))
            .filter(pending_verifications::code.eq(code))
            .filter(pending_verifications::attempts.lt(max_attempts)),
    )
    .execute(conn)
    .await?;

    Ok(deleted > 0)
}
