//! HTTP server: listener, outer layers, and graceful shutdown.

use std::time::Duration;

use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use lectern_core::LecternConfig;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::Result;
use crate::routes::router;
use crate::state::AppState;

/// A configured server ready to accept connections.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Build application state from `config`.
    pub async fn bind(config: LecternConfig) -> Result<Self> {
        let state = AppState::from_config(config).await?;
        Ok(Self { state })
    }

    /// Wrap existing state.
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    /// The full application: routes plus tracing and CORS.
    pub fn app(&self) -> Router {
        let mut app = router(self.state.clone()).layer(TraceLayer::new_for_http());
        if let Some(cors) = cors_layer(&self.state.config.server.cors_origins) {
            app = app.layer(cors);
        }
        app
    }

    /// Listen on the configured address until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> Result<()> {
        let address = self.state.config.server.address();
        let listener = TcpListener::bind(&address).await?;
        info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.state.db.close().await;
        info!("Server stopped");
        Ok(())
    }
}

/// CORS for the configured origins. `None` when no origins are set;
/// `"*"` allows any origin without credentials.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(AllowOrigin::any()));
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(
        layer
            .allow_origin(AllowOrigin::list(parsed))
            .allow_credentials(true),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_origins_no_cors() {
        assert!(cors_layer(&[]).is_none());
    }

    #[test]
    fn test_origins_build_layer() {
        assert!(cors_layer(&["*".to_string()]).is_some());
        assert!(cors_layer(&["https://learn.school.edu".to_string()]).is_some());
    }
}
