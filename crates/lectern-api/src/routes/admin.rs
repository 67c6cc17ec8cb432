//! Admin endpoints: settings, analytics, users, and content maintenance.

use axum::Json;
use axum::extract::{Path, State};
use http::StatusCode;
use lectern_auth::Role;
use lectern_content::{ContentIssue, Severity};
use lectern_core::now_millis;
use lectern_storage::{
    CourseStats, KcPassRate, LessonCompletionCount, SettingRecord, UserRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::error::ApiError;
use crate::extract::RequireAdmin;
use crate::state::AppState;

const ACTIVE_WINDOW_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

// ============================================================================
// Settings
// ============================================================================

pub async fn list_settings(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<SettingRecord>>, ApiError> {
    Ok(Json(state.db.list_settings().await?))
}

pub async fn get_setting(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
) -> Result<Json<SettingRecord>, ApiError> {
    state
        .db
        .get_setting(&key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("setting '{key}' not found")))
}

pub async fn put_setting(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<SettingRecord>, ApiError> {
    let record = state.db.put_setting(&key, &value, Some(&admin.id)).await?;
    info!(key = %record.key, by = %admin.email, "Setting updated");
    Ok(Json(record))
}

pub async fn delete_setting(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_setting(&key).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("setting '{key}' not found")))
    }
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Overview {
    active_users_7d: i64,
    courses: Vec<CourseStats>,
}

#[derive(Debug, Serialize)]
pub struct KcRate {
    #[serde(flatten)]
    counts: KcPassRate,
    pass_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CourseAnalytics {
    stats: CourseStats,
    lessons: Vec<LessonCompletionCount>,
    knowledge_checks: Vec<KcRate>,
}

/// Stats for every published course plus recent activity.
pub async fn overview(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Overview>, ApiError> {
    let mut courses = Vec::new();
    for summary in state.content.list_courses().await? {
        courses.push(state.db.course_stats(&summary.slug).await?);
    }
    let active_users_7d = state
        .db
        .active_users_since(now_millis() - ACTIVE_WINDOW_MILLIS)
        .await?;
    Ok(Json(Overview {
        active_users_7d,
        courses,
    }))
}

/// Detailed numbers for one course.
pub async fn course_analytics(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(course): Path<String>,
) -> Result<Json<CourseAnalytics>, ApiError> {
    state.content.course(&course).await?;
    let stats = state.db.course_stats(&course).await?;
    let lessons = state.db.lesson_completion_counts(&course).await?;
    let knowledge_checks = state
        .db
        .kc_pass_rates(&course)
        .await?
        .into_iter()
        .map(|counts| KcRate {
            pass_rate: counts.pass_rate(),
            counts,
        })
        .collect();
    Ok(Json(CourseAnalytics {
        stats,
        lessons,
        knowledge_checks,
    }))
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    role: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.db.list_users().await?))
}

pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<UserRecord>, ApiError> {
    let role: Role = req.role.parse().map_err(ApiError::Validation)?;
    let record = state.db.set_role(&id, role.as_str()).await?;
    info!(user_id = %id, role = %role, by = %admin.email, "Role changed");
    Ok(Json(record))
}

// ============================================================================
// Content
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    errors: usize,
    warnings: usize,
    issues: Vec<ContentIssue>,
}

/// Drop every cached course and lesson.
pub async fn reload_content(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Value>, ApiError> {
    let (courses, lessons) = state.content.cache_len().await;
    state.content.clear_cache().await;
    info!(by = %admin.email, "Content cache cleared");
    Ok(Json(json!({
        "cleared": { "courses": courses, "lessons": lessons }
    })))
}

/// Load every course and report problems.
pub async fn validate_content(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<ValidationReport>, ApiError> {
    let issues = state.content.validate_all().await?;
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    Ok(Json(ValidationReport {
        errors,
        warnings: issues.len() - errors,
        issues,
    }))
}
