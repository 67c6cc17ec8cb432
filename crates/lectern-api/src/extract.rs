//! Request extractors for the authenticated user and role guards.

use axum::extract::FromRequestParts;
use http::request::Parts;
use lectern_auth::{AuthMode, AuthenticatedUser, user_from_parts};

use crate::error::ApiError;
use crate::state::AppState;

/// The user the auth middleware identified.
///
/// Outside dev mode the account is re-read from the database so role
/// changes apply without waiting for a new session token, and deleted
/// accounts are rejected.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts)
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("not authenticated"))?;
        if state.config.auth.mode == AuthMode::Dev {
            return Ok(Self(user));
        }

        let record = state
            .db
            .user_by_id(&user.id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("account no longer exists"))?;
        Ok(Self(AuthenticatedUser {
            role: record.role.parse().unwrap_or_default(),
            id: record.id,
            email: record.email,
            display_name: record.display_name,
        }))
    }
}

/// A user allowed to review content (reviewer or admin). 403 otherwise.
#[derive(Debug, Clone)]
pub struct RequireReviewer(pub AuthenticatedUser);

impl FromRequestParts<AppState> for RequireReviewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.can_review() {
            return Err(ApiError::forbidden("reviewer role required"));
        }
        Ok(Self(user))
    }
}

/// An admin. 403 otherwise.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(ApiError::forbidden("admin role required"));
        }
        Ok(Self(user))
    }
}
