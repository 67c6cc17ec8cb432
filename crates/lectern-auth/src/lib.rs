//! Authentication for Lectern.
//!
//! Provides:
//! - [`AuthenticatedUser`] and [`Role`]: identity stored in request extensions
//! - [`TokenValidator`]: async token validation, implemented by [`SessionTokens`]
//! - [`SessionTokens`]: HS256 session JWTs issued after login
//! - [`OidcValidator`]: RS256 OIDC ID token validation against a cached JWKS
//! - [`password`]: Argon2id password hashing
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware with a dev-mode bypass
//! - [`AuthError`]: auth-specific errors

mod error;
mod middleware;
pub mod oidc;
pub mod password;
mod session;
mod user;

pub use error::AuthError;
pub use lectern_core::AuthMode;
pub use middleware::{AuthLayer, AuthService, SESSION_COOKIE};
pub use oidc::{Jwk, OidcIdentity, OidcValidator};
pub use session::{SessionClaims, SessionTokens};
pub use user::{AuthenticatedUser, DEV_USER_EMAIL, DEV_USER_ID, Role, email_from_parts, user_from_parts};

/// Configuration for the auth middleware.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// `dev` bypasses token checks entirely.
    pub mode: AuthMode,
    /// Display name given to the injected dev user.
    pub dev_display_name: Option<String>,
}

impl AuthConfig {
    /// Build from the `[auth]` config section.
    pub fn from_settings(settings: &lectern_core::AuthSettings) -> Self {
        Self {
            mode: settings.mode,
            dev_display_name: Some("Developer".to_string()),
        }
    }

    /// Whether requests must carry a valid token.
    pub fn requires_token(&self) -> bool {
        self.mode != AuthMode::Dev
    }
}

/// Validates tokens and returns the user they identify.
///
/// The middleware calls `validate()` with the bearer token or session
/// cookie and stores the returned user in request extensions.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate a token and return the authenticated user.
    fn validate(
        &self,
        token: &str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>,
    >;
}
