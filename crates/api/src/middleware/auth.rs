//! Authentication extractor for API routes.
//!
//! Every `/api` handler takes a [`CurrentUser`]. Extraction runs the full
//! chain once per request: read the bearer token, verify it with the
//! configured identity provider, then resolve (or create) the matching user.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 `{"error": ..}` when the header is missing, malformed,
/// or the provider rejects the token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> Json<User> {
///     Json(user)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthenticated("missing or malformed bearer token".to_string())
        })?;

        let claim = state.verifier().verify(token).await?;
        let user = state.directory().ensure_user(&claim).await?;

        set_sentry_user(user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        Ok(Self(user))
    }
}
