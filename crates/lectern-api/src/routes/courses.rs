//! Course content, lesson progress, and knowledge checks.

use axum::Json;
use axum::extract::{Path, State};
use lectern_auth::AuthenticatedUser;
use lectern_content::{CourseSummary, Lesson, LessonRef, NavigationTree, PublicKnowledgeCheck};
use lectern_progress::{Answers, CompletionOutcome, KnowledgeCheckResult, LessonState};
use lectern_storage::KcSubmission;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

type LessonPath = Path<(String, String, String)>;
type ModulePath = Path<(String, String)>;

#[derive(Debug, Serialize)]
pub struct LessonResponse {
    lesson: Lesson,
    progress: LessonState,
    prev: Option<LessonRef>,
    next: Option<LessonRef>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    answers: Answers,
}

/// Unpublished courses exist only for reviewers and admins.
async fn ensure_visible(
    state: &AppState,
    user: &AuthenticatedUser,
    course: &str,
) -> Result<(), ApiError> {
    let loaded = state.content.course(course).await?;
    if !loaded.published && !user.role.can_review() {
        return Err(ApiError::not_found(format!("course '{course}' not found")));
    }
    Ok(())
}

/// Published courses.
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<CourseSummary>>, ApiError> {
    Ok(Json(state.content.list_courses().await?))
}

/// Course navigation with the caller's progress.
pub async fn navigation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course): Path<String>,
) -> Result<Json<NavigationTree>, ApiError> {
    ensure_visible(&state, &user, &course).await?;
    Ok(Json(state.progress.navigation_for(&user.id, &course).await?))
}

/// Compiled lesson. Opening it records a view.
pub async fn lesson(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course, module, lesson)): LessonPath,
) -> Result<Json<LessonResponse>, ApiError> {
    ensure_visible(&state, &user, &course).await?;
    let compiled = state.content.lesson(&course, &module, &lesson).await?;
    let progress = state
        .progress
        .view_lesson(&user.id, &course, &module, &lesson)
        .await?;

    let tree = state.content.navigation(&course).await?;
    let (prev, next) = tree
        .lesson(&module, &lesson)
        .map(|l| (l.prev.clone(), l.next.clone()))
        .unwrap_or_default();

    Ok(Json(LessonResponse {
        lesson: Lesson::clone(&compiled),
        progress,
        prev,
        next,
    }))
}

/// Mark a lesson completed.
pub async fn complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course, module, lesson)): LessonPath,
) -> Result<Json<CompletionOutcome>, ApiError> {
    ensure_visible(&state, &user, &course).await?;
    let outcome = state
        .progress
        .complete_lesson(&user.id, &course, &module, &lesson)
        .await?;
    Ok(Json(outcome))
}

/// Questions for a module's knowledge check.
pub async fn questions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course, module)): ModulePath,
) -> Result<Json<PublicKnowledgeCheck>, ApiError> {
    ensure_visible(&state, &user, &course).await?;
    Ok(Json(state.knowledge.questions(&course, &module).await?))
}

/// Grade a submission.
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course, module)): ModulePath,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<KnowledgeCheckResult>, ApiError> {
    ensure_visible(&state, &user, &course).await?;
    let result = state
        .knowledge
        .submit(&user.id, &course, &module, &req.answers)
        .await?;
    Ok(Json(result))
}

/// The caller's previous submissions, newest first.
pub async fn attempts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course, module)): ModulePath,
) -> Result<Json<Vec<KcSubmission>>, ApiError> {
    ensure_visible(&state, &user, &course).await?;
    Ok(Json(
        state.knowledge.attempts(&user.id, &course, &module).await?,
    ))
}
