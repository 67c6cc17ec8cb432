use axum::Json;
use axum::extract::{Path, State};
use lectern_progress::DashboardEntry;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

/// Courses the caller has started.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<DashboardEntry>>, ApiError> {
    Ok(Json(state.progress.dashboard(&user.id).await?))
}

/// Forget the caller's progress in one course.
pub async fn reset(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.progress.reset_course(&user.id, &course).await?;
    Ok(Json(json!({ "course": course, "removed": removed })))
}
