//! Reviewer annotations on lessons.

use axum::Json;
use axum::extract::{Path, Query, State};
use http::StatusCode;
use lectern_storage::{AnnotationRecord, NewAnnotation};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::RequireReviewer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAnnotation {
    #[serde(default)]
    anchor: Option<String>,
    body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnotation {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    resolved: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Include resolved annotations.
    #[serde(default)]
    all: bool,
}

async fn require_lesson(
    state: &AppState,
    course: &str,
    module: &str,
    lesson: &str,
) -> Result<(), ApiError> {
    let loaded = state.content.course(course).await?;
    if loaded.lesson(module, lesson).is_none() {
        return Err(ApiError::not_found(format!(
            "lesson '{course}/{module}/{lesson}' not found"
        )));
    }
    Ok(())
}

/// Annotations on one lesson.
pub async fn list_for_lesson(
    State(state): State<AppState>,
    _reviewer: RequireReviewer,
    Path((course, module, lesson)): Path<(String, String, String)>,
) -> Result<Json<Vec<AnnotationRecord>>, ApiError> {
    require_lesson(&state, &course, &module, &lesson).await?;
    Ok(Json(
        state
            .db
            .annotations_for_lesson(&course, &module, &lesson)
            .await?,
    ))
}

/// Annotate a lesson.
pub async fn create(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Path((course, module, lesson)): Path<(String, String, String)>,
    Json(req): Json<CreateAnnotation>,
) -> Result<(StatusCode, Json<AnnotationRecord>), ApiError> {
    require_lesson(&state, &course, &module, &lesson).await?;
    let record = state
        .db
        .insert_annotation(&NewAnnotation {
            author_id: user.id,
            course,
            module,
            lesson,
            anchor: req.anchor.filter(|a| !a.trim().is_empty()),
            body: req.body,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Edit the body (author or admin) and/or resolve (any reviewer).
pub async fn update(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Path(id): Path<String>,
    Json(req): Json<UpdateAnnotation>,
) -> Result<Json<AnnotationRecord>, ApiError> {
    let existing = state
        .db
        .annotation(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("annotation {id} not found")))?;

    let mut record = existing;
    if let Some(body) = &req.body {
        if record.author_id != user.id && !user.role.is_admin() {
            return Err(ApiError::forbidden("only the author or an admin can edit an annotation"));
        }
        record = state.db.update_annotation_body(&id, body).await?;
    }
    if let Some(resolved) = req.resolved {
        record = state.db.set_annotation_resolved(&id, resolved).await?;
    }
    Ok(Json(record))
}

/// Delete an annotation (author or admin).
pub async fn remove(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = state
        .db
        .annotation(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("annotation {id} not found")))?;
    if existing.author_id != user.id && !user.role.is_admin() {
        return Err(ApiError::forbidden("only the author or an admin can delete an annotation"));
    }
    state.db.delete_annotation(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Open annotations across all lessons (`?all=true` includes resolved).
pub async fn list_open(
    State(state): State<AppState>,
    _reviewer: RequireReviewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AnnotationRecord>>, ApiError> {
    Ok(Json(state.db.list_annotations(!query.all).await?))
}
