//! Signup, email verification, login, password recovery and own-profile
//! operations.
//!
//! Accounts only come into existence once the code sent to their email
//! address is confirmed. Until then the signup data is staged on the
//! pending verification of that address.

use crate::{
    app_state::AppState,
    models::{
        account::{AccountRecord, NewAccount},
        pending_verification::{generate_code, NewPendingVerification, StagedAccount},
        revoked_session::NewRevokedSession,
    },
    setups::{
        CodeCheck, IdentityStore, NotificationSender, ResetRedemption, ServerSetup,
        SignupRedemption,
    },
};
use anyhow::anyhow;
use chrono::Utc;
use lapmart_core::{
    common::{
        AccountResponse, BioUpdateRequest, ImageUpdateRequest, LoginRequest, LoginResponse,
        PasswordResetRequest, ResendCodeRequest, SetNewPasswordRequest, SignupRequest,
        VerifyCodeRequest,
    },
    purpose::VerificationPurpose,
    role::Operation,
};
use validator::Validate;

pub mod error;
pub mod password;
pub mod session;

pub use error::IdentityError;
pub use session::Session;

/// Result of a successful code verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verified {
    /// The staged account was created (or already existed with the same data)
    AccountCreated(i32),
    /// The password of the account was replaced
    PasswordReset,
}

/// Emails are compared after trimming and lowercasing
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Stage an account and email a verification code.
///
/// The account itself is only created by [verify_code].
pub async fn begin_signup<S: ServerSetup>(
    state: &AppState<S>,
    request: SignupRequest,
) -> Result<(), IdentityError> {
    let request = SignupRequest {
        name: request.name.trim().to_string(),
        email: normalize_email(&request.email),
        ..request
    };
    request.validate()?;

    if state
        .store
        .find_account_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(IdentityError::DuplicateAccount);
    }

    let password_hash = password::hash_password(request.password).await?;
    let staged = StagedAccount {
        display_name: request.name,
        password_hash,
        phone: request.mobile.filter(|mobile| !mobile.trim().is_empty()),
    };

    tracing::info!(email = %request.email, "Signup started");

    issue_code(
        state,
        &request.email,
        VerificationPurpose::VerifyEmail,
        Some(staged),
    )
    .await
}

/// Replace the code of a pending verification with a fresh one and email it
pub async fn resend_code<S: ServerSetup>(
    state: &AppState<S>,
    request: ResendCodeRequest,
) -> Result<(), IdentityError> {
    let request = ResendCodeRequest {
        email: normalize_email(&request.email),
        ..request
    };
    request.validate()?;

    let pending = state
        .store
        .find_pending(&request.email)
        .await?
        .ok_or(IdentityError::NotFound("OTP"))?;

    let purpose = pending.purpose()?;

    if let Some(requested) = request.purpose.as_deref() {
        let requested = requested
            .parse::<VerificationPurpose>()
            .map_err(|_| IdentityError::InvalidPurpose)?;

        if requested != purpose {
            return Err(IdentityError::NotFound("OTP"));
        }
    }

    let code = generate_code();
    let expires_at = Utc::now().naive_utc() + state.verification.code_ttl();

    let pending = state
        .store
        .reissue_code(&request.email, purpose, &code, expires_at)
        .await?
        .ok_or(IdentityError::NotFound("OTP"))?;

    metrics::increment_counter!("lapmart_otp_issued_total", "purpose" => purpose.as_str(), "kind" => "resend");
    tracing::info!(email = %pending.email, %purpose, "Code reissued");

    deliver(state, &pending.email, "Your OTP", &format!("<h3>{code}</h3>")).await
}

/// Check a code and complete the flow it was issued for.
///
/// Checks happen in this order: the record must exist, must not be locked by
/// too many failed attempts, the code must match, must not be expired, and
/// the purpose must be the one it was issued for. A wrong code only bumps the
/// attempt counter, in the same store operation that compares it, so parallel
/// guesses cannot exceed the attempt limit. A matching code is consumed
/// exactly once, together with the account write it pays for.
pub async fn verify_code<S: ServerSetup>(
    state: &AppState<S>,
    request: VerifyCodeRequest,
) -> Result<Verified, IdentityError> {
    let request = VerifyCodeRequest {
        email: normalize_email(&request.email),
        otp: request.otp.trim().to_string(),
        ..request
    };
    request.validate()?;

    let max_attempts = state.verification.max_attempts;
    let pending = match state
        .store
        .check_code(&request.email, &request.otp, max_attempts)
        .await?
    {
        CodeCheck::Missing => return Err(IdentityError::NotFound("OTP")),
        CodeCheck::Locked => {
            record_outcome("locked");
            return Err(IdentityError::TooManyAttempts);
        }
        CodeCheck::Mismatch { attempts } => {
            record_outcome("invalid_code");
            tracing::info!(email = %request.email, attempts, "Wrong verification code");
            return Err(IdentityError::InvalidCode);
        }
        CodeCheck::Matched(pending) => pending,
    };

    if pending.is_expired(Utc::now().naive_utc()) {
        record_outcome("expired");
        return Err(IdentityError::CodeExpired);
    }

    let purpose = request
        .purpose
        .parse::<VerificationPurpose>()
        .map_err(|_| IdentityError::InvalidPurpose)?;

    if purpose != pending.purpose()? {
        record_outcome("wrong_purpose");
        return Err(IdentityError::InvalidPurpose);
    }

    match purpose {
        VerificationPurpose::VerifyEmail => {
            let staged = pending.staged_account().ok_or_else(|| {
                anyhow!(
                    "Pending email verification for {} has no staged account",
                    pending.email
                )
            })?;
            let new_account = NewAccount::verified_user(
                pending.email.clone(),
                staged.display_name,
                staged.password_hash,
                staged.phone,
            );

            let account = match state
                .store
                .redeem_signup(&pending.email, &pending.code, max_attempts, &new_account)
                .await?
            {
                SignupRedemption::Spent => return Err(code_spent()),
                SignupRedemption::Created(account) => {
                    tracing::info!(account_id = account.id, email = %account.email, "Account created");
                    account
                }
                SignupRedemption::Existing(account) if same_signup(&account, &new_account) => {
                    account
                }
                SignupRedemption::Existing(_) => return Err(IdentityError::DuplicateAccount),
            };
            record_outcome("account_created");

            Ok(Verified::AccountCreated(account.id))
        }
        VerificationPurpose::ResetPassword => {
            let new_password = request
                .new_password
                .ok_or_else(|| IdentityError::Validation("Password required".to_string()))?;
            let password_hash = password::hash_password(new_password).await?;

            match state
                .store
                .redeem_reset(&pending.email, &pending.code, max_attempts, &password_hash)
                .await?
            {
                ResetRedemption::Spent => return Err(code_spent()),
                ResetRedemption::UnknownAccount => return Err(IdentityError::NotFound("User")),
                ResetRedemption::Reset => {}
            }

            record_outcome("password_reset");
            tracing::info!(email = %pending.email, "Password reset");

            Ok(Verified::PasswordReset)
        }
    }
}

/// Check email and password, and sign a session token
pub async fn login<S: ServerSetup>(
    state: &AppState<S>,
    request: LoginRequest,
) -> Result<LoginResponse, IdentityError> {
    let request = LoginRequest {
        email: normalize_email(&request.email),
        ..request
    };
    request.validate()?;

    let account = state
        .store
        .find_account_by_email(&request.email)
        .await?
        .ok_or(IdentityError::NotFound("User"))?;

    if !account.is_verified {
        return Err(IdentityError::EmailUnverified);
    }

    if !password::verify_password(request.password, account.password_hash.clone()).await? {
        metrics::increment_counter!("lapmart_logins_total", "outcome" => "invalid_credentials");
        return Err(IdentityError::InvalidCredentials);
    }

    let user = account.to_summary()?;
    let token = state.session_keys.issue(account.id, user.role)?;

    metrics::increment_counter!("lapmart_logins_total", "outcome" => "success");
    tracing::info!(account_id = account.id, "Login");

    Ok(LoginResponse {
        msg: "Login successful".to_string(),
        token,
        user,
    })
}

/// Email a password reset code to an existing account
pub async fn request_reset<S: ServerSetup>(
    state: &AppState<S>,
    request: PasswordResetRequest,
) -> Result<(), IdentityError> {
    let email = normalize_email(&request.email);
    PasswordResetRequest {
        email: email.clone(),
    }
    .validate()?;

    if state.store.find_account_by_email(&email).await?.is_none() {
        return Err(IdentityError::NotFound("User"));
    }

    issue_code(state, &email, VerificationPurpose::ResetPassword, None).await
}

/// Complete a password reset with the emailed code
pub async fn set_new_password<S: ServerSetup>(
    state: &AppState<S>,
    request: SetNewPasswordRequest,
) -> Result<(), IdentityError> {
    let request = SetNewPasswordRequest {
        email: normalize_email(&request.email),
        ..request
    };
    request.validate()?;

    verify_code(
        state,
        VerifyCodeRequest {
            email: request.email,
            otp: request.otp,
            purpose: VerificationPurpose::ResetPassword.to_string(),
            new_password: Some(request.new_password),
        },
    )
    .await?;

    Ok(())
}

/// Revoke the session token until its own expiry
pub async fn logout<S: ServerSetup>(
    state: &AppState<S>,
    session: &Session,
) -> Result<(), IdentityError> {
    session.require(Operation::EndSession)?;

    state
        .store
        .revoke_session(&NewRevokedSession {
            jti: session.jti.clone(),
            account_id: session.account_id,
            expires_at: session.expires_at,
        })
        .await?;

    tracing::info!(account_id = session.account_id, "Logout");

    Ok(())
}

/// The account behind a session
pub async fn me<S: ServerSetup>(
    state: &AppState<S>,
    session: &Session,
) -> Result<AccountResponse, IdentityError> {
    session.require(Operation::ViewOwnAccount)?;

    let account = state
        .store
        .find_account_by_id(session.account_id)
        .await?
        .ok_or(IdentityError::NotFound("User"))?;

    Ok(account.to_account()?)
}

/// Replace the bio of the account behind a session
pub async fn update_bio<S: ServerSetup>(
    state: &AppState<S>,
    session: &Session,
    request: BioUpdateRequest,
) -> Result<AccountRecord, IdentityError> {
    session.require(Operation::UpdateOwnProfile)?;
    request.validate()?;

    state
        .store
        .update_bio(session.account_id, &request.bio)
        .await?
        .ok_or(IdentityError::NotFound("User"))
}

/// Replace the avatar of the account behind a session
pub async fn update_image<S: ServerSetup>(
    state: &AppState<S>,
    session: &Session,
    request: ImageUpdateRequest,
) -> Result<AccountRecord, IdentityError> {
    session.require(Operation::UpdateOwnProfile)?;

    let image_url = request
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| IdentityError::Validation("Image URL required".to_string()))?;
    request.validate()?;

    state
        .store
        .update_image(
            session.account_id,
            image_url,
            request.image_public_id.as_deref().unwrap_or_default(),
        )
        .await?
        .ok_or(IdentityError::NotFound("User"))
}

async fn issue_code<S: ServerSetup>(
    state: &AppState<S>,
    email: &str,
    purpose: VerificationPurpose,
    staged: Option<StagedAccount>,
) -> Result<(), IdentityError> {
    let now = Utc::now().naive_utc();
    let record = NewPendingVerification::issue(
        email,
        purpose,
        staged,
        now,
        now + state.verification.code_ttl(),
    );

    let pending = state.store.upsert_pending(&record).await?;

    metrics::increment_counter!("lapmart_otp_issued_total", "purpose" => purpose.as_str(), "kind" => "new");
    tracing::info!(email, %purpose, expires_at = %pending.expires_at, "Code issued");

    let (subject, body) = match purpose {
        VerificationPurpose::VerifyEmail => {
            ("Verify Email", format!("<h3>Your OTP: {}</h3>", pending.code))
        }
        VerificationPurpose::ResetPassword => ("Reset Password", format!("<h3>{}</h3>", pending.code)),
    };

    deliver(state, email, subject, &body).await
}

/// Hand a message to the notification sender. The pending record stays in
/// place when this fails, a resend can pick it up.
async fn deliver<S: ServerSetup>(
    state: &AppState<S>,
    to: &str,
    subject: &str,
    html_body: &str,
) -> Result<(), IdentityError> {
    state
        .notification_sender
        .send(to, subject, html_body)
        .await
        .map_err(|err| {
            metrics::increment_counter!("lapmart_otp_delivery_failures_total");
            tracing::error!(to, subject, error = %err, "Email delivery failed");
            IdentityError::Delivery(err)
        })
}

/// Someone else spent the code first, or wrong guesses locked it meanwhile
fn code_spent() -> IdentityError {
    record_outcome("already_consumed");
    IdentityError::NotFound("OTP")
}

/// A conflicting account holding the data that was staged counts as this
/// signup having gone through already
fn same_signup(existing: &AccountRecord, staged: &NewAccount) -> bool {
    existing.display_name == staged.display_name && existing.password_hash == staged.password_hash
}

fn record_outcome(outcome: &'static str) {
    metrics::increment_counter!("lapmart_otp_verifications_total", "outcome" => outcome);
}
