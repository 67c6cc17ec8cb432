//! Row types returned by [`Database`](crate::Database) methods.

use serde::{Deserialize, Serialize};

/// `lesson_progress.status` for an opened lesson.
pub const LESSON_IN_PROGRESS: &str = "in_progress";

/// `lesson_progress.status` for a completed lesson.
pub const LESSON_COMPLETED: &str = "completed";

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    /// `learner`, `reviewer`, or `admin`.
    pub role: String,
    pub created_at: i64,
    pub last_login_at: Option<i64>,
}

/// Per-lesson progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonProgressRecord {
    pub user_id: String,
    pub course: String,
    pub module: String,
    pub lesson: String,
    /// `in_progress` or `completed`. A missing row means not started.
    pub status: String,
    pub view_count: i64,
    pub first_viewed_at: i64,
    pub last_viewed_at: i64,
    pub completed_at: Option<i64>,
}

impl LessonProgressRecord {
    /// Whether the lesson is completed.
    pub fn is_completed(&self) -> bool {
        self.status == LESSON_COMPLETED
    }
}

/// Per-module progress, including knowledge check state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModuleProgressRecord {
    pub user_id: String,
    pub course: String,
    pub module: String,
    pub status: String,
    /// Sticky once true.
    pub kc_passed: bool,
    pub best_score: Option<i64>,
    pub kc_attempts: i64,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}

/// Per-course progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseProgressRecord {
    pub user_id: String,
    pub course: String,
    pub current_module: Option<String>,
    pub started_at: i64,
    pub last_activity_at: i64,
    /// Set once and never cleared except by a reset.
    pub completed_at: Option<i64>,
}

impl CourseProgressRecord {
    /// Whether the course has been completed.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A stored knowledge check submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KcSubmission {
    pub id: i64,
    pub user_id: String,
    pub course: String,
    pub module: String,
    /// Question id to selected choice index, as submitted.
    pub answers: serde_json::Value,
    pub score: i64,
    pub passed: bool,
    /// 1 for the first attempt, then consecutive.
    pub attempt: i64,
    pub submitted_at: i64,
}

/// Feedback to store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub user_id: String,
    pub course: String,
    pub module: Option<String>,
    pub lesson: Option<String>,
    pub rating: Option<i64>,
    pub comment: String,
}

/// Stored feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedbackRecord {
    pub id: String,
    pub user_id: String,
    pub course: String,
    pub module: Option<String>,
    pub lesson: Option<String>,
    pub rating: Option<i64>,
    pub comment: String,
    pub created_at: i64,
}

/// Filter for listing feedback. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackFilter {
    pub course: Option<String>,
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub limit: Option<i64>,
}

/// Annotation to store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub author_id: String,
    pub course: String,
    pub module: String,
    pub lesson: String,
    /// Heading anchor or other locator inside the lesson.
    pub anchor: Option<String>,
    pub body: String,
}

/// Stored annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnnotationRecord {
    pub id: String,
    pub author_id: String,
    pub course: String,
    pub module: String,
    pub lesson: String,
    pub anchor: Option<String>,
    pub body: String,
    pub resolved: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A settings entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_by: Option<String>,
    pub updated_at: i64,
}

/// Aggregate numbers for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseStats {
    pub course: String,
    /// Users with a course progress row.
    pub enrolled: i64,
    pub completed: i64,
    pub average_kc_score: Option<f64>,
    pub average_rating: Option<f64>,
    pub feedback_count: i64,
}

/// Number of users who completed a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonCompletionCount {
    pub module: String,
    pub lesson: String,
    pub completed: i64,
}

/// Knowledge check outcomes for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KcPassRate {
    pub module: String,
    pub attempts: i64,
    pub passed_attempts: i64,
    /// Distinct users with at least one passing attempt.
    pub users_passed: i64,
    /// Distinct users with any attempt.
    pub users_attempted: i64,
}

impl KcPassRate {
    /// Passing attempts over all attempts, 0.0 when there are none.
    pub fn pass_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.passed_attempts as f64 / self.attempts as f64
        }
    }
}
