//! Sign-in endpoints. Each returns a session token in the body and as the
//! session cookie.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::SET_COOKIE;
use lectern_auth::password::{check_strength, hash_password, verify_password};
use lectern_auth::{AuthError, AuthMode, AuthenticatedUser, Role, SESSION_COOKIE};
use lectern_storage::UserRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct OidcRequest {
    id_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    token: String,
    token_type: &'static str,
    expires_in: u64,
    user: AuthenticatedUser,
}

fn require_mode(state: &AppState, mode: AuthMode) -> Result<(), ApiError> {
    if state.config.auth.mode != mode {
        return Err(ApiError::not_found(format!(
            "this endpoint requires auth.mode = \"{mode}\""
        )));
    }
    Ok(())
}

fn to_user(record: UserRecord) -> AuthenticatedUser {
    AuthenticatedUser {
        role: record.role.parse().unwrap_or_default(),
        id: record.id,
        email: record.email,
        display_name: record.display_name,
    }
}

fn session(state: &AppState, status: StatusCode, user: AuthenticatedUser) -> Result<Response, ApiError> {
    let token = state.sessions.issue(&user)?;
    let ttl = state.sessions.ttl().as_secs();
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl}");
    let body = SessionResponse {
        token,
        token_type: "Bearer",
        expires_in: ttl,
        user,
    };
    Ok((status, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email.to_string()),
        _ => Err(ApiError::validation(format!("'{email}' is not a valid email address"))),
    }
}

/// Create a local account.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    require_mode(&state, AuthMode::Local)?;
    let email = normalize_email(&req.email)?;
    check_strength(&req.password)?;

    let hash = hash_password(&req.password)?;
    let role = state.initial_role(&email);
    let display_name = req.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let record = state
        .db
        .create_local_user(&email, display_name, &hash, role.as_str())
        .await?;

    info!(user_id = %record.id, role = %role, "Registered local user");
    session(&state, StatusCode::CREATED, to_user(record))
}

/// Exchange email and password for a session.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    require_mode(&state, AuthMode::Local)?;
    let email = req.email.trim();

    let Some(hash) = state.db.password_hash_for(email).await? else {
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(&req.password, &hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let record = state
        .db
        .user_by_email(email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    state.db.touch_login(&record.id).await?;
    session(&state, StatusCode::OK, to_user(record))
}

/// Exchange a provider ID token for a session.
pub async fn oidc(
    State(state): State<AppState>,
    Json(req): Json<OidcRequest>,
) -> Result<Response, ApiError> {
    require_mode(&state, AuthMode::Oidc)?;
    let validator = state
        .oidc
        .as_ref()
        .ok_or_else(|| ApiError::internal("OIDC provider is not configured"))?;

    let identity = validator.validate_id_token(&req.id_token).await?;
    let role: Role = state.initial_role(&identity.email);
    let record = state
        .db
        .upsert_oidc_user(
            &identity.subject,
            &identity.email,
            identity.name.as_deref(),
            role.as_str(),
        )
        .await?;

    info!(user_id = %record.id, "OIDC sign-in");
    session(&state, StatusCode::OK, to_user(record))
}

/// The signed-in user.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}
