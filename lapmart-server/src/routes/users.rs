//! Lapmart User Routes

use crate::{
    app_state::AppState,
    error::AppResult,
    extract::json::Json,
    identity::{self, Session, Verified},
    setups::ServerSetup,
};
use axum::{extract::State, http::StatusCode};
use lapmart_core::common::{
    AccountResponse, BioResponse, BioUpdateRequest, ImageResponse, ImageUpdateRequest,
    LoginRequest, LoginResponse, MessageResponse, OtpSentResponse, PasswordResetRequest,
    ResendCodeRequest, SetNewPasswordRequest, SignupRequest, VerifiedResponse, VerifyCodeRequest,
};

/// POST handler for starting a signup
#[utoipa::path(
    post,
    path = "/api/users/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Verification code sent", body = OtpSentResponse),
        (status = 400, description = "Missing fields or user already exists", body = AppError),
        (status = 500, description = "Email could not be delivered", body = AppError),
    )
)]
pub async fn signup<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<OtpSentResponse>)> {
    identity::begin_signup(&state, request).await?;

    Ok((StatusCode::OK, Json(OtpSentResponse::new("OTP sent to email"))))
}

/// POST handler for resending a verification code
#[utoipa::path(
    post,
    path = "/api/users/resend-otp",
    request_body = ResendCodeRequest,
    responses(
        (status = 200, description = "Fresh code sent", body = OtpSentResponse),
        (status = 400, description = "Invalid purpose", body = AppError),
        (status = 404, description = "No pending verification", body = AppError),
    )
)]
pub async fn resend_otp<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<ResendCodeRequest>,
) -> AppResult<(StatusCode, Json<OtpSentResponse>)> {
    identity::resend_code(&state, request).await?;

    Ok((StatusCode::OK, Json(OtpSentResponse::new("OTP resent"))))
}

/// POST handler for confirming a verification code
#[utoipa::path(
    post,
    path = "/api/users/verify-otp",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Account created or password reset", body = VerifiedResponse),
        (status = 400, description = "Invalid, expired or misdirected code", body = AppError),
        (status = 404, description = "No pending verification", body = AppError),
        (status = 429, description = "Too many failed attempts", body = AppError),
    )
)]
pub async fn verify_otp<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<VerifyCodeRequest>,
) -> AppResult<(StatusCode, Json<VerifiedResponse>)> {
    let response = match identity::verify_code(&state, request).await? {
        Verified::AccountCreated(id) => VerifiedResponse {
            msg: "Account created".to_string(),
            user_id: Some(id),
        },
        Verified::PasswordReset => VerifiedResponse {
            msg: "Password reset successful".to_string(),
            user_id: None,
        },
    };

    Ok((StatusCode::OK, Json(response)))
}

/// POST handler for logging in
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = AppError),
        (status = 401, description = "Email not verified", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    )
)]
pub async fn login<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    let response = identity::login(&state, request).await?;

    Ok((StatusCode::OK, Json(response)))
}

/// POST handler for logging out.
///
/// Succeeds without a (valid) session as well.
#[utoipa::path(
    post,
    path = "/api/users/logout",
    security(
        (),
        ("session_bearer" = []),
    ),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
    )
)]
pub async fn logout<S: ServerSetup>(
    State(state): State<AppState<S>>,
    session: Option<Session>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    if let Some(session) = session {
        identity::logout(&state, &session).await?;
    }

    Ok((StatusCode::OK, Json(MessageResponse::new("Logged out"))))
}

/// POST handler for requesting a password reset code
#[utoipa::path(
    post,
    path = "/api/users/reset-password",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset code sent", body = OtpSentResponse),
        (status = 404, description = "User not found", body = AppError),
    )
)]
pub async fn reset_password<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<PasswordResetRequest>,
) -> AppResult<(StatusCode, Json<OtpSentResponse>)> {
    identity::request_reset(&state, request).await?;

    Ok((StatusCode::OK, Json(OtpSentResponse::new("OTP sent"))))
}

/// POST handler for setting a new password with a reset code
#[utoipa::path(
    post,
    path = "/api/users/set-new-password",
    request_body = SetNewPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid or expired code", body = AppError),
        (status = 404, description = "No pending reset", body = AppError),
    )
)]
pub async fn set_new_password<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<SetNewPasswordRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    identity::set_new_password(&state, request).await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Password reset successful")),
    ))
}

/// GET handler for the account of the current session
#[utoipa::path(
    get,
    path = "/api/users/me",
    security(
        ("session_bearer" = []),
    ),
    responses(
        (status = 200, description = "Found account", body = AccountResponse),
        (status = 401, description = "Missing or invalid session token", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    )
)]
pub async fn me<S: ServerSetup>(
    State(state): State<AppState<S>>,
    session: Session,
) -> AppResult<(StatusCode, Json<AccountResponse>)> {
    let account = identity::me(&state, &session).await?;

    Ok((StatusCode::OK, Json(account)))
}

/// PUT handler for replacing the bio
#[utoipa::path(
    put,
    path = "/api/users/profile/bio",
    request_body = BioUpdateRequest,
    security(
        ("session_bearer" = []),
    ),
    responses(
        (status = 200, description = "Bio updated", body = BioResponse),
        (status = 401, description = "Missing or invalid session token", body = AppError),
    )
)]
pub async fn update_bio<S: ServerSetup>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(request): Json<BioUpdateRequest>,
) -> AppResult<(StatusCode, Json<BioResponse>)> {
    let account = identity::update_bio(&state, &session, request).await?;

    Ok((
        StatusCode::OK,
        Json(BioResponse {
            msg: "Bio updated successfully".to_string(),
            bio: account.bio,
        }),
    ))
}

/// PUT handler for replacing the avatar
#[utoipa::path(
    put,
    path = "/api/users/profile/image",
    request_body = ImageUpdateRequest,
    security(
        ("session_bearer" = []),
    ),
    responses(
        (status = 200, description = "Avatar updated", body = ImageResponse),
        (status = 400, description = "Image URL required", body = AppError),
        (status = 401, description = "Missing or invalid session token", body = AppError),
    )
)]
pub async fn update_image<S: ServerSetup>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(request): Json<ImageUpdateRequest>,
) -> AppResult<(StatusCode, Json<ImageResponse>)> {
    let account = identity::update_image(&state, &session, request).await?;

    Ok((
        StatusCode::OK,
        Json(ImageResponse {
            msg: "Profile image updated".to_string(),
            image_url: account.image_url,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::{
        error::ErrorResponse,
        test_utils::{route_builder::RouteBuilder, test_context::TestContext},
    };
    use http::{Method, StatusCode};
    use lapmart_core::{
        common::{
            AccountResponse, BioResponse, LoginResponse, MessageResponse, OtpSentResponse,
            VerifiedResponse,
        },
        role::Role,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    async fn signup_and_verify(ctx: &TestContext, email: &str) -> TestResult<i32> {
        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/signup")
            .with_json_body(json!({
                "name": "Ana",
                "email": email,
                "password": "pw123",
                "mobile": "555-0100",
            }))?
            .into_json_response::<OtpSentResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/verify-otp")
            .with_json_body(json!({
                "email": email,
                "otp": ctx.last_code(email)?,
                "purpose": "VERIFY_EMAIL",
            }))?
            .into_json_response::<VerifiedResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);

        Ok(body.user_id.ok_or("missing userId")?)
    }

    async fn login(ctx: &TestContext, email: &str, password: &str) -> TestResult<String> {
        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/login")
            .with_json_body(json!({ "email": email, "password": password }))?
            .into_json_response::<LoginResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);

        Ok(body.token)
    }

    #[test_log::test(tokio::test)]
    async fn test_signup_verify_login() -> TestResult {
        let ctx = TestContext::new();

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/signup")
            .with_json_body(json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw123",
                "mobile": "555-0100",
            }))?
            .into_json_response::<serde_json::Value>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "otp_sent", "msg": "OTP sent to email" }));

        let code = ctx.last_code("ana@x.com")?;
        let wrong = if code == "111111" { "222222" } else { "111111" };

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/verify-otp")
            .with_json_body(json!({
                "email": "ana@x.com",
                "otp": wrong,
                "purpose": "VERIFY_EMAIL",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.errors[0].detail(), Some("Invalid OTP"));

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/verify-otp")
            .with_json_body(json!({
                "email": "ana@x.com",
                "otp": code,
                "purpose": "VERIFY_EMAIL",
            }))?
            .into_json_response::<serde_json::Value>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["msg"], "Account created");
        assert!(body["userId"].is_i64());

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/login")
            .with_json_body(json!({ "email": "ana@x.com", "password": "pw123" }))?
            .into_json_response::<serde_json::Value>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["msg"], "Login successful");
        assert!(body["token"].is_string());
        assert_eq!(body["user"]["role"], "USER");
        assert_eq!(body["user"]["email"], "ana@x.com");

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_duplicate_signup() -> TestResult {
        let ctx = TestContext::new();
        signup_and_verify(&ctx, "ana@x.com").await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/signup")
            .with_json_body(json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw123",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.errors[0].detail(), Some("User already exists"));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_signup_missing_fields() -> TestResult {
        let ctx = TestContext::new();

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/signup")
            .with_json_body(json!({ "email": "ana@x.com" }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_verify_without_pending_record() -> TestResult {
        let ctx = TestContext::new();

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/verify-otp")
            .with_json_body(json!({
                "email": "ana@x.com",
                "otp": "123456",
                "purpose": "VERIFY_EMAIL",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.errors[0].detail(), Some("OTP not found"));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_lockout_is_too_many_requests() -> TestResult {
        let ctx = TestContext::new();
        RouteBuilder::new(ctx.app(), Method::POST, "/api/users/signup")
            .with_json_body(json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw123",
            }))?
            .into_raw_response()
            .await?;
        let code = ctx.last_code("ana@x.com")?;
        let wrong = if code == "111111" { "222222" } else { "111111" };

        let mut statuses = Vec::new();
        for otp in [wrong, wrong, wrong, wrong, wrong, code.as_str()] {
            let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/verify-otp")
                .with_json_body(json!({
                    "email": "ana@x.com",
                    "otp": otp,
                    "purpose": "VERIFY_EMAIL",
                }))?
                .into_raw_response()
                .await?;
            statuses.push(status);
        }

        assert_eq!(statuses[..5], [StatusCode::BAD_REQUEST; 5]);
        assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_delivery_failure_is_internal_error() -> TestResult {
        let ctx = TestContext::new();
        ctx.notification_sender().set_failing(true);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/signup")
            .with_json_body(json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw123",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(ctx.store().pending("ana@x.com").is_some());
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_login_unknown_user() -> TestResult {
        let ctx = TestContext::new();

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/login")
            .with_json_body(json!({ "email": "nobody@x.com", "password": "pw123" }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.errors[0].detail(), Some("User not found"));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_password_reset_flow() -> TestResult {
        let ctx = TestContext::new();
        signup_and_verify(&ctx, "ana@x.com").await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/reset-password")
            .with_json_body(json!({ "email": "ana@x.com" }))?
            .into_json_response::<serde_json::Value>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "otp_sent", "msg": "OTP sent" }));

        let (status, body) =
            RouteBuilder::new(ctx.app(), Method::POST, "/api/users/set-new-password")
                .with_json_body(json!({
                    "email": "ana@x.com",
                    "otp": ctx.last_code("ana@x.com")?,
                    "newPassword": "new-pw",
                }))?
                .into_json_response::<MessageResponse>()
                .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.msg, "Password reset successful");

        login(&ctx, "ana@x.com", "new-pw").await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/login")
            .with_json_body(json!({ "email": "ana@x.com", "password": "pw123" }))?
            .into_json_response::<ErrorResponse>()
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.errors[0].detail(), Some("Invalid credentials"));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_reset_unknown_user() -> TestResult {
        let ctx = TestContext::new();

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/reset-password")
            .with_json_body(json!({ "email": "nobody@x.com" }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_me_requires_session() -> TestResult {
        let ctx = TestContext::new();

        let (status, _) = RouteBuilder::new(ctx.app(), Method::GET, "/api/users/me")
            .into_json_response::<ErrorResponse>()
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::GET, "/api/users/me")
            .with_bearer("not-a-token")
            .into_json_response::<ErrorResponse>()
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_me_hides_password_hash() -> TestResult {
        let ctx = TestContext::new();
        let id = signup_and_verify(&ctx, "ana@x.com").await?;
        let token = login(&ctx, "ana@x.com", "pw123").await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::GET, "/api/users/me")
            .with_bearer(&token)
            .into_json_response::<serde_json::Value>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        assert_eq!(body["isVerified"], true);
        assert_eq!(body["mobile"], "555-0100");
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("password_hash").is_none());

        let account: AccountResponse = serde_json::from_value(body)?;
        assert_eq!(account.role, Role::User);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_logout_revokes_token() -> TestResult {
        let ctx = TestContext::new();
        signup_and_verify(&ctx, "ana@x.com").await?;
        let token = login(&ctx, "ana@x.com", "pw123").await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/logout")
            .with_bearer(&token)
            .into_json_response::<MessageResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.msg, "Logged out");

        let (status, _) = RouteBuilder::new(ctx.app(), Method::GET, "/api/users/me")
            .with_bearer(&token)
            .into_json_response::<ErrorResponse>()
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Other sessions stay valid
        let other = login(&ctx, "ana@x.com", "pw123").await?;
        let (status, _) = RouteBuilder::new(ctx.app(), Method::GET, "/api/users/me")
            .with_bearer(&other)
            .into_json_response::<AccountResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_logout_without_session() -> TestResult {
        let ctx = TestContext::new();

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/logout")
            .into_json_response::<MessageResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/users/logout")
            .with_bearer("garbage")
            .into_json_response::<MessageResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_profile_routes() -> TestResult {
        let ctx = TestContext::new();
        let id = signup_and_verify(&ctx, "ana@x.com").await?;
        ctx.store().set_role(id, Role::Owner);
        let token = login(&ctx, "ana@x.com", "pw123").await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::PUT, "/api/users/profile/bio")
            .with_bearer(&token)
            .with_json_body(json!({ "bio": "Refurbished laptops" }))?
            .into_json_response::<BioResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.bio.as_deref(), Some("Refurbished laptops"));

        let (status, body) =
            RouteBuilder::new(ctx.app(), Method::PUT, "/api/users/profile/image")
                .with_bearer(&token)
                .with_json_body(json!({ "imagePublicId": "abc" }))?
                .into_json_response::<ErrorResponse>()
                .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.errors[0].detail(), Some("Image URL required"));

        let (status, body) =
            RouteBuilder::new(ctx.app(), Method::PUT, "/api/users/profile/image")
                .with_bearer(&token)
                .with_json_body(json!({
                    "imageUrl": "https://img.example.com/ana.png",
                    "imagePublicId": "abc",
                }))?
                .into_json_response::<serde_json::Value>()
                .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "msg": "Profile image updated",
                "imageUrl": "https://img.example.com/ana.png",
            })
        );

        let (_, account) = RouteBuilder::new(ctx.app(), Method::GET, "/api/users/me")
            .with_bearer(&token)
            .into_json_response::<AccountResponse>()
            .await?;
        assert_eq!(account.role, Role::Owner);
        assert_eq!(account.image_public_id.as_deref(), Some("abc"));
        Ok(())
    }
}
