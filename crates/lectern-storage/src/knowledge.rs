//! Knowledge check submission history.

use lectern_core::now_millis;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::types::KcSubmission;
use crate::Database;

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: i64,
    user_id: String,
    course: String,
    module: String,
    answers: String,
    score: i64,
    passed: bool,
    attempt: i64,
    submitted_at: i64,
}

impl TryFrom<SubmissionRow> for KcSubmission {
    type Error = serde_json::Error;

    fn try_from(row: SubmissionRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            course: row.course,
            module: row.module,
            answers: serde_json::from_str(&row.answers)?,
            score: row.score,
            passed: row.passed,
            attempt: row.attempt,
            submitted_at: row.submitted_at,
        })
    }
}

impl Database {
    /// Store a graded submission. The attempt number is one past the
    /// learner's previous attempt for the module.
    pub async fn insert_kc_submission(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        answers: &Value,
        score: i64,
        passed: bool,
    ) -> Result<KcSubmission> {
        let answers_json = serde_json::to_string(answers)?;
        let submitted_at = now_millis();

        // One statement so the attempt read and the insert share a write lock.
        let (id, attempt): (i64, i64) = sqlx::query_as(
            r#"
            INSERT INTO kc_submissions
                (user_id, course, module, answers, score, passed, attempt, submitted_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, COALESCE(MAX(attempt), 0) + 1, ?7
            FROM kc_submissions
            WHERE user_id = ?1 AND course = ?2 AND module = ?3
            RETURNING id, attempt
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(&answers_json)
        .bind(score)
        .bind(passed)
        .bind(submitted_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id, course, module, attempt, score, passed, "Knowledge check submission stored");
        Ok(KcSubmission {
            id,
            user_id: user_id.to_string(),
            course: course.to_string(),
            module: module.to_string(),
            answers: answers.clone(),
            score,
            passed,
            attempt,
            submitted_at,
        })
    }

    /// A learner's submissions for a module, newest first.
    pub async fn kc_submissions(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
    ) -> Result<Vec<KcSubmission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, user_id, course, module, answers, score, passed, attempt, submitted_at
            FROM kc_submissions
            WHERE user_id = ? AND course = ? AND module = ?
            ORDER BY attempt DESC
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| KcSubmission::try_from(row).map_err(StorageError::from))
            .collect()
    }

    /// Highest score across a learner's attempts, if any.
    pub async fn best_kc_score(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
    ) -> Result<Option<i64>> {
        let best: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(score) FROM kc_submissions WHERE user_id = ? AND course = ? AND module = ?",
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .fetch_one(&self.pool)
        .await?;
        Ok(best)
    }
}
