use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
    site: String,
    auth_mode: String,
    database: &'static str,
    courses: usize,
}

/// Liveness plus a little context. Never fails; problems show in the body.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = match state.db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            "unavailable"
        }
    };
    let courses = state
        .content
        .list_courses()
        .await
        .map(|c| c.len())
        .unwrap_or(0);

    Json(Health {
        status: if database == "ok" { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        site: state.config.site_name.clone(),
        auth_mode: state.config.auth.mode.to_string(),
        database,
        courses,
    })
}
