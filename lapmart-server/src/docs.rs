//! OpenAPI doc generation.

use crate::{
    error::AppError,
    extract::bearer_addon::BearerAddon,
    routes::{health, ping, users},
};
use lapmart_core::{
    common::{
        AccountResponse, AccountSummary, BioResponse, BioUpdateRequest, DispatchStatus,
        ImageResponse, ImageUpdateRequest, LoginRequest, LoginResponse, MessageResponse,
        OtpSentResponse, PasswordResetRequest, ResendCodeRequest, SetNewPasswordRequest,
        SignupRequest, VerifiedResponse, VerifyCodeRequest,
    },
    role::Role,
};
use utoipa::OpenApi;

/// API documentation generator.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck,
        ping::get,
        users::signup,
        users::resend_otp,
        users::verify_otp,
        users::login,
        users::logout,
        users::reset_password,
        users::set_new_password,
        users::me,
        users::update_bio,
        users::update_image,
    ),
    components(
        schemas(
            AppError,
            SignupRequest,
            ResendCodeRequest,
            VerifyCodeRequest,
            LoginRequest,
            PasswordResetRequest,
            SetNewPasswordRequest,
            BioUpdateRequest,
            ImageUpdateRequest,
            DispatchStatus,
            OtpSentResponse,
            MessageResponse,
            VerifiedResponse,
            AccountSummary,
            LoginResponse,
            AccountResponse,
            BioResponse,
            ImageResponse,
            Role,
            health::HealthcheckResponse
        )
    ),
    modifiers(&BearerAddon),
)]

/// Tied to OpenAPI documentation.
#[derive(Debug)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_user_routes() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/users/verify-otp"));
        assert!(doc.paths.paths.contains_key("/api/users/profile/image"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|components| components.security_schemes.contains_key("session_bearer")));
    }
}
