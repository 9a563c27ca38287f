//! Session extractor

use crate::{
    app_state::AppState,
    error::AppError,
    identity::{IdentityError, Session},
    setups::{IdentityStore, ServerSetup},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    RequestPartsExt,
};

#[async_trait]
impl<S: ServerSetup> FromRequestParts<AppState<S>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        Ok(do_extract_session(parts, state).await?)
    }
}

async fn do_extract_session<S: ServerSetup>(
    parts: &mut Parts,
    state: &AppState<S>,
) -> Result<Session, IdentityError> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| IdentityError::InvalidToken)?;

    let session = state.session_keys.verify(bearer.token())?;

    if state.store.is_session_revoked(&session.jti).await? {
        tracing::debug!(jti = %session.jti, "Rejected revoked session token");
        return Err(IdentityError::InvalidToken);
    }

    Ok(session)
}
