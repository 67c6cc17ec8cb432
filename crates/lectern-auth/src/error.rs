//! Auth-specific error types.

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No Authorization header, bearer token, or session cookie present.
    #[error("missing authentication token")]
    MissingToken,

    /// Token format is invalid (not a valid JWT, bad claims).
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// JWT signature verification failed.
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token audience doesn't match the configured client ID.
    #[error("invalid audience")]
    InvalidAudience,

    /// Token issuer doesn't match the configured issuer.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// Email domain doesn't match the allowed domain.
    #[error("invalid domain: got '{domain}', expected '{expected}'")]
    InvalidDomain {
        /// Domain found in the token.
        domain: String,
        /// Configured allowed domain.
        expected: String,
    },

    /// Token is missing the email claim.
    #[error("token missing email claim")]
    MissingEmail,

    /// The provider has not verified the email address.
    #[error("email is not verified")]
    UnverifiedEmail,

    /// Failed to fetch JWKS from the identity provider.
    #[error("failed to fetch JWKS: {0}")]
    JwksFetchError(String),

    /// No key in the JWKS matches the token's kid.
    #[error("no matching key for kid '{0}'")]
    NoMatchingKey(String),

    /// Email and password do not match a user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Password does not meet the minimum requirements.
    #[error("password must be at least {min} characters")]
    WeakPassword {
        /// Minimum length in characters.
        min: usize,
    },

    /// Hashing or token signing failed.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this error should result in a 401 (vs. a 500).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::JwksFetchError(_) | AuthError::Internal(_))
    }
}
