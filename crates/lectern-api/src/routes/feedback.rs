//! Learner feedback and its admin listing.

use axum::Json;
use axum::extract::{Path, Query, State};
use http::StatusCode;
use lectern_storage::{FeedbackFilter, FeedbackRecord, NewFeedback};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{CurrentUser, RequireAdmin};
use crate::state::AppState;

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    course: String,
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    lesson: Option<String>,
    #[serde(default)]
    rating: Option<i64>,
    comment: String,
}

/// Submit feedback on a course, module, or lesson.
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackRecord>), ApiError> {
    let comment = req.comment.trim();
    if comment.is_empty() {
        return Err(ApiError::validation("comment must not be empty"));
    }
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(ApiError::validation(format!(
            "comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    if let Some(rating) = req.rating
        && !(1..=5).contains(&rating)
    {
        return Err(ApiError::validation("rating must be between 1 and 5"));
    }

    let course = state.content.course(&req.course).await?;
    match (&req.module, &req.lesson) {
        (None, Some(_)) => {
            return Err(ApiError::validation("a lesson requires its module"));
        }
        (Some(module), None) if course.module(module).is_none() => {
            return Err(ApiError::not_found(format!("module '{module}' not found")));
        }
        (Some(module), Some(lesson)) if course.lesson(module, lesson).is_none() => {
            return Err(ApiError::not_found(format!(
                "lesson '{module}/{lesson}' not found"
            )));
        }
        _ => {}
    }

    let record = state
        .db
        .insert_feedback(&NewFeedback {
            user_id: user.id,
            course: req.course,
            module: req.module,
            lesson: req.lesson,
            rating: req.rating,
            comment: comment.to_string(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Feedback matching the query filters, newest first.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filter): Query<FeedbackFilter>,
) -> Result<Json<Vec<FeedbackRecord>>, ApiError> {
    Ok(Json(state.db.list_feedback(&filter).await?))
}

/// Delete one feedback entry.
pub async fn remove(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_feedback(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("feedback {id} not found")))
    }
}
