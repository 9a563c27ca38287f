//! Request and response data types that are common and useful between clients of and the lapmart server

use crate::role::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Signup request, starts email verification
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct SignupRequest {
    /// Display name of the new account
    #[validate(length(min = 1, message = "name is required"))]
    #[schema(example = "Ana")]
    pub name: String,
    /// The email address of the user signing up
    #[validate(email)]
    #[schema(example = "ana@example.com")]
    pub email: String,
    /// Plaintext password, hashed before it is staged
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// Optional phone number
    #[serde(default)]
    #[schema(example = "555-0100")]
    pub mobile: Option<String>,
}

/// Ask for a fresh code for an in-flight verification
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct ResendCodeRequest {
    /// Email the pending verification belongs to
    #[validate(email)]
    pub email: String,
    /// Restrict the resend to a pending verification of this purpose
    /// (`VERIFY_EMAIL` or `RESET_PASSWORD`)
    #[serde(default)]
    pub purpose: Option<String>,
}

/// Confirm a one-time code
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    /// Email the code was sent to
    #[validate(email)]
    pub email: String,
    /// The 6-digit code
    #[validate(length(min = 1, message = "otp is required"))]
    #[schema(example = "492817")]
    pub otp: String,
    /// `VERIFY_EMAIL` or `RESET_PASSWORD`
    #[schema(example = "VERIFY_EMAIL")]
    pub purpose: String,
    /// Required when `purpose` is `RESET_PASSWORD`
    #[serde(default)]
    #[validate(length(min = 1, message = "newPassword must not be empty"))]
    pub new_password: Option<String>,
}

/// Password login
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct LoginRequest {
    /// Account email
    #[validate(email)]
    pub email: String,
    /// Plaintext password
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Start a password reset
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct PasswordResetRequest {
    /// Account email
    #[validate(email)]
    pub email: String,
}

/// Finish a password reset with the emailed code
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetNewPasswordRequest {
    /// Account email
    #[validate(email)]
    pub email: String,
    /// The reset code that was emailed
    #[validate(length(min = 1, message = "otp is required"))]
    pub otp: String,
    /// The password to set
    #[validate(length(min = 1, message = "newPassword is required"))]
    pub new_password: String,
}

/// Replace the bio of the current account
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct BioUpdateRequest {
    /// New bio text, may be empty
    #[validate(length(max = 1000))]
    pub bio: String,
}

/// Replace the avatar of the current account
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdateRequest {
    /// Where the uploaded image lives
    #[serde(default)]
    #[validate(required(message = "Image URL required"), url)]
    pub image_url: Option<String>,
    /// Identifier of the image at the upload provider
    #[serde(default)]
    pub image_public_id: Option<String>,
}

/// Whether a code went out
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// A code was generated and handed to the mail provider
    OtpSent,
}

/// Response for every route that emails a code
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct OtpSentResponse {
    /// Always `otp_sent`
    pub status: DispatchStatus,
    /// Human-readable message
    pub msg: String,
}

impl OtpSentResponse {
    /// Create a new response with the given message
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            status: DispatchStatus::OtpSent,
            msg: msg.into(),
        }
    }
}

/// Response with only a human-readable message
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageResponse {
    /// Human-readable message
    pub msg: String,
}

impl MessageResponse {
    /// Create a new response
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Response to a successful code verification
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedResponse {
    /// Human-readable message
    pub msg: String,
    /// The account created by an email verification
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<i32>,
}

/// The public part of an account, as returned on login
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct AccountSummary {
    /// Account id
    pub id: i32,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role of the account
    pub role: Role,
}

/// Response to a successful login
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct LoginResponse {
    /// Human-readable message
    pub msg: String,
    /// Bearer token for the `Authorization` header
    pub token: String,
    /// Who logged in
    pub user: AccountSummary,
}

/// Information about an account, without credentials
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Account id
    pub id: i32,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number, if given at signup
    pub mobile: Option<String>,
    /// Role of the account
    pub role: Role,
    /// Whether the email address was verified
    pub is_verified: bool,
    /// Short profile text
    pub bio: Option<String>,
    /// Avatar location
    pub image_url: Option<String>,
    /// Avatar identifier at the upload provider
    pub image_public_id: Option<String>,
}

/// Response to a bio update
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct BioResponse {
    /// Human-readable message
    pub msg: String,
    /// The stored bio
    pub bio: Option<String>,
}

/// Response to an avatar update
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    /// Human-readable message
    pub msg: String,
    /// The stored image location
    pub image_url: Option<String>,
}
