//! OIDC ID token validation.
//!
//! Verifies RS256 ID tokens from any OpenID Connect provider against its
//! JWKS endpoint. Keys are cached for an hour and refetched on an unknown
//! `kid` so provider key rotation is picked up without a restart.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use crate::AuthError;

/// TTL for cached JWKS keys.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID, matched against the JWT header's `kid`.
    pub kid: String,
    /// Key type. Only `RSA` keys are usable.
    #[serde(default)]
    pub kty: Option<String>,
    /// RSA modulus (base64url-encoded).
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent (base64url-encoded).
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    /// An RSA key from its components.
    pub fn rsa(kid: impl Into<String>, n: impl Into<String>, e: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            kty: Some("RSA".to_string()),
            n: Some(n.into()),
            e: Some(e.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

struct CachedKeys {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// Identity asserted by a validated ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcIdentity {
    /// Provider subject identifier.
    pub subject: String,
    /// Verified email address.
    pub email: String,
    /// Display name, if the provider sent one.
    pub name: Option<String>,
}

/// Validates OIDC ID tokens with JWKS caching.
pub struct OidcValidator {
    cached: RwLock<Option<CachedKeys>>,
    jwks_url: String,
    issuer: String,
    audience: String,
    allowed_domain: Option<String>,
    http_client: Option<reqwest::Client>,
}

impl OidcValidator {
    /// Create a validator that fetches keys from `jwks_url`.
    pub fn new(
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            cached: RwLock::new(None),
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            allowed_domain: None,
            http_client: Some(reqwest::Client::new()),
        }
    }

    /// Build from the `[auth]` config section. Returns `None` unless the
    /// issuer, audience, and JWKS URL are all set.
    pub fn from_settings(settings: &lectern_core::AuthSettings) -> Option<Self> {
        if settings.oidc_issuer.is_empty()
            || settings.oidc_audience.is_empty()
            || settings.oidc_jwks_url.is_empty()
        {
            return None;
        }
        Some(
            Self::new(
                settings.oidc_jwks_url.as_str(),
                settings.oidc_issuer.as_str(),
                settings.oidc_audience.as_str(),
            )
            .with_allowed_domain(Some(settings.allowed_domain.clone())),
        )
    }

    /// Create a validator with fixed keys and no network access.
    pub fn with_static_keys(
        keys: Vec<Jwk>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            cached: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
            jwks_url: String::new(),
            issuer: issuer.into(),
            audience: audience.into(),
            allowed_domain: None,
            http_client: None,
        }
    }

    /// Only accept emails in this domain.
    pub fn with_allowed_domain(mut self, domain: Option<String>) -> Self {
        self.allowed_domain = domain.filter(|d| !d.is_empty());
        self
    }

    /// Validate an ID token.
    pub async fn validate_id_token(&self, token: &str) -> Result<OidcIdentity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidFormat(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidFormat("missing kid in JWT header".to_string()))?;

        let key = self.find_key(&kid).await?;
        let (Some(n), Some(e)) = (&key.n, &key.e) else {
            return Err(AuthError::InvalidFormat(format!("key '{kid}' is not an RSA key")));
        };
        let decoding_key = DecodingKey::from_rsa_components(n, e)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<IdTokenClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::InvalidSignature(e.to_string()),
            })?
            .claims;

        let email = claims.email.ok_or(AuthError::MissingEmail)?;
        if claims.email_verified != Some(true) {
            return Err(AuthError::UnverifiedEmail);
        }
        self.check_domain(&email)?;

        log::debug!("Validated ID token for {email}");
        Ok(OidcIdentity {
            subject: claims.sub,
            email,
            name: claims.name,
        })
    }

    fn check_domain(&self, email: &str) -> Result<(), AuthError> {
        let Some(expected) = &self.allowed_domain else {
            return Ok(());
        };
        let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or("");
        if !domain.eq_ignore_ascii_case(expected) {
            return Err(AuthError::InvalidDomain {
                domain: domain.to_string(),
                expected: expected.clone(),
            });
        }
        Ok(())
    }

    async fn find_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        if let Some(key) = self.lookup_cached(kid) {
            return Ok(key);
        }

        if self.http_client.is_some() {
            self.refresh_keys().await?;
            if let Some(key) = self.lookup_cached(kid) {
                return Ok(key);
            }
        }

        Err(AuthError::NoMatchingKey(kid.to_string()))
    }

    fn lookup_cached(&self, kid: &str) -> Option<Jwk> {
        let cache = self.cached.read().ok()?;
        let cached = cache.as_ref()?;

        if self.http_client.is_some() && cached.fetched_at.elapsed() > JWKS_CACHE_TTL {
            return None;
        }

        cached.keys.iter().find(|k| k.kid == kid).cloned()
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let client = self.http_client.as_ref().ok_or_else(|| {
            AuthError::JwksFetchError("no HTTP client (static keys mode)".to_string())
        })?;

        log::info!("Fetching JWKS from {}", self.jwks_url);
        let response: JwksResponse = client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let mut cache = self
            .cached
            .write()
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;
        *cache = Some(CachedKeys {
            keys: response.keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}
