//! Tower authentication middleware.
//!
//! `AuthLayer` and `AuthService` wrap any inner service with token
//! validation, generic over [`TokenValidator`]. In dev mode every request
//! carries the fixed dev user and no token is read.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use tower::{Layer, Service};

use crate::{AuthConfig, AuthenticatedUser, TokenValidator};

/// Cookie holding the session token for browser clients.
pub const SESSION_COOKIE: &str = "lectern_session";

/// Tower `Layer` that wraps services with token authentication.
#[derive(Clone)]
pub struct AuthLayer<V: TokenValidator> {
    validator: Arc<V>,
    config: AuthConfig,
}

impl<V: TokenValidator> AuthLayer<V> {
    /// Create a new auth layer with the given validator and config.
    pub fn new(validator: Arc<V>, config: AuthConfig) -> Self {
        Self { validator, config }
    }
}

impl<V: TokenValidator, S> Layer<S> for AuthLayer<V> {
    type Service = AuthService<V, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

/// Tower `Service` that validates tokens before forwarding requests.
///
/// On success, inserts [`AuthenticatedUser`] into request extensions.
#[derive(Clone)]
pub struct AuthService<V: TokenValidator, S> {
    inner: S,
    validator: Arc<V>,
    config: AuthConfig,
}

impl<V, S> Service<Request<Body>> for AuthService<V, S>
where
    V: TokenValidator,
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let validator = self.validator.clone();
        let config = self.config.clone();

        Box::pin(async move {
            if !config.requires_token() {
                req.extensions_mut()
                    .insert(AuthenticatedUser::dev(config.dev_display_name.clone()));
                let resp = inner
                    .call(req)
                    .await
                    .unwrap_or_else(|infallible| match infallible {});
                return Ok(resp.into_response());
            }

            let token = match extract_token(&req) {
                Some(t) => t.to_string(),
                None => return Ok(unauthorized_response("missing or invalid bearer token")),
            };

            match validator.validate(&token).await {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                Err(auth_err) => {
                    log::warn!("Authentication failed: {auth_err}");
                    Ok(unauthorized_response(&auth_err.to_string()))
                }
            }
        })
    }
}

/// Bearer token from the Authorization header, else the session cookie.
fn extract_token(req: &Request<Body>) -> Option<&str> {
    extract_bearer_token(req).or_else(|| extract_session_cookie(req))
}

fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn extract_session_cookie(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// Build a 401 response with the standard JSON error envelope.
fn unauthorized_response(message: &str) -> axum::response::Response {
    let body = serde_json::json!({
        "error": {
            "category": "authentication",
            "message": message,
        }
    });

    (
        StatusCode::UNAUTHORIZED,
        [
            (http::header::CONTENT_TYPE, "application/json"),
            (http::header::WWW_AUTHENTICATE, "Bearer realm=\"lectern\""),
        ],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthError, AuthMode, DEV_USER_EMAIL, Role};
    use std::sync::Mutex;
    use tower::ServiceExt;

    // Accepts "valid-token" and rejects everything else.
    struct TestValidator;

    impl TokenValidator for TestValidator {
        fn validate(
            &self,
            token: &str,
        ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>>
        {
            let token = token.to_string();
            Box::pin(async move {
                if token == "valid-token" {
                    Ok(AuthenticatedUser {
                        id: "u1".to_string(),
                        email: "ada@school.edu".to_string(),
                        display_name: None,
                        role: Role::Learner,
                    })
                } else {
                    Err(AuthError::InvalidSignature("bad token".to_string()))
                }
            })
        }
    }

    fn config(mode: AuthMode) -> AuthConfig {
        AuthConfig {
            mode,
            dev_display_name: None,
        }
    }

    /// Inner service that captures the AuthenticatedUser.
    #[derive(Clone)]
    struct MockService {
        captured_user: Arc<Mutex<Option<AuthenticatedUser>>>,
    }

    impl MockService {
        fn new() -> Self {
            Self {
                captured_user: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl Service<Request<Body>> for MockService {
        type Response = axum::response::Response;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Body>) -> Self::Future {
            let captured = self.captured_user.clone();
            Box::pin(async move {
                let user = req.extensions().get::<AuthenticatedUser>().cloned();
                *captured.lock().unwrap() = user;
                Ok((StatusCode::OK, "ok").into_response())
            })
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = Request::builder()
            .header("Authorization", "Bearer my-token-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), Some("my-token-123"));

        let req = Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), None);
    }

    #[test]
    fn test_extract_session_cookie() {
        let req = Request::builder()
            .header("Cookie", "theme=dark; lectern_session=abc.def.ghi; other=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), Some("abc.def.ghi"));

        let req = Request::builder()
            .header("Cookie", "lectern_session=")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), None);
    }

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let req = Request::builder()
            .header("Authorization", "Bearer from-header")
            .header("Cookie", "lectern_session=from-cookie")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), Some("from-header"));
    }

    #[tokio::test]
    async fn test_unauthorized_response_envelope() {
        let resp = unauthorized_response("test error");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["category"], "authentication");
        assert_eq!(body["error"]["message"], "test error");
    }

    #[tokio::test]
    async fn test_dev_mode_injects_dev_user() {
        let mock = MockService::new();
        let captured = mock.captured_user.clone();
        let service = AuthLayer::new(Arc::new(TestValidator), config(AuthMode::Dev)).layer(mock);

        let req = Request::builder().body(Body::empty()).unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let user = captured.lock().unwrap();
        let user = user.as_ref().expect("dev user should be present");
        assert_eq!(user.email, DEV_USER_EMAIL);
        assert!(user.role.is_admin());
    }

    #[tokio::test]
    async fn test_missing_token_returns_401() {
        let service =
            AuthLayer::new(Arc::new(TestValidator), config(AuthMode::Local)).layer(MockService::new());
        let req = Request::builder().body(Body::empty()).unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_returns_401() {
        let service =
            AuthLayer::new(Arc::new(TestValidator), config(AuthMode::Oidc)).layer(MockService::new());
        let req = Request::builder()
            .header("Authorization", "Bearer bad-token")
            .body(Body::empty())
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_cookie_passes_and_injects_user() {
        let mock = MockService::new();
        let captured = mock.captured_user.clone();
        let service = AuthLayer::new(Arc::new(TestValidator), config(AuthMode::Local)).layer(mock);

        let req = Request::builder()
            .header("Cookie", "lectern_session=valid-token")
            .body(Body::empty())
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let user = captured.lock().unwrap();
        assert_eq!(user.as_ref().map(|u| u.id.as_str()), Some("u1"));
    }
}
