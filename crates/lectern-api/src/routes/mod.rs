//! Route table.
//!
//! Health and sign-in routes are public. Everything else sits behind the
//! auth middleware, with reviewer and admin checks done by extractors.

mod admin;
mod annotations;
mod auth;
mod courses;
mod feedback;
mod health;
mod progress;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use lectern_auth::{AuthConfig, AuthLayer};

use crate::state::AppState;

/// Build the API router (without the outer trace and CORS layers).
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/oidc", post(auth::oidc));

    let lesson = "/api/courses/{course}/modules/{module}/lessons/{lesson}";
    let check = "/api/courses/{course}/modules/{module}/knowledge-check";

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        // Learning
        .route("/api/courses", get(courses::list))
        .route("/api/courses/{course}", get(courses::navigation))
        .route(lesson, get(courses::lesson))
        .route(&format!("{lesson}/complete"), post(courses::complete))
        .route(check, get(courses::questions).post(courses::submit))
        .route(&format!("{check}/attempts"), get(courses::attempts))
        .route("/api/progress", get(progress::dashboard))
        .route("/api/progress/{course}", delete(progress::reset))
        .route("/api/feedback", post(feedback::submit))
        // Review
        .route(
            &format!("{lesson}/annotations"),
            get(annotations::list_for_lesson).post(annotations::create),
        )
        .route(
            "/api/annotations/{id}",
            patch(annotations::update).delete(annotations::remove),
        )
        .route("/api/admin/annotations", get(annotations::list_open))
        // Admin
        .route("/api/admin/feedback", get(feedback::list))
        .route(
            "/api/admin/feedback/{id}",
            delete(feedback::remove),
        )
        .route("/api/admin/settings", get(admin::list_settings))
        .route(
            "/api/admin/settings/{key}",
            get(admin::get_setting)
                .put(admin::put_setting)
                .delete(admin::delete_setting),
        )
        .route("/api/admin/analytics", get(admin::overview))
        .route("/api/admin/analytics/{course}", get(admin::course_analytics))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/role", put(admin::set_role))
        .route("/api/admin/content/reload", post(admin::reload_content))
        .route("/api/admin/content/validate", get(admin::validate_content))
        .route_layer(AuthLayer::new(
            state.sessions.clone(),
            AuthConfig::from_settings(&state.config.auth),
        ));

    public.merge(protected).with_state(state)
}
