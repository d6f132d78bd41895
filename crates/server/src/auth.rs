//! Bearer-token authentication.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use folio_core::{Error, User};

use crate::error::ApiError;
use crate::state::AppState;

/// The user owning the request's bearer token.
pub struct CurrentUser(pub User);

/// A [`CurrentUser`] with the superuser flag set.
pub struct Superuser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
        let user = state.store.user_by_token(token).await?.ok_or(Error::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<AppState> for Superuser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_superuser {
            tracing::info!(user = %user.username, path = %parts.uri.path(), "superuser required");
            return Err(Error::Forbidden(format!("{} is not a superuser", user.username)).into());
        }
        Ok(Superuser(user))
    }
}
