//! Read-only aggregates for the admin dashboard.

use crate::Database;
use crate::error::Result;
use crate::types::{CourseStats, KcPassRate, LessonCompletionCount};

impl Database {
    /// Enrollment, completion, score, and rating numbers for one course.
    pub async fn course_stats(&self, course: &str) -> Result<CourseStats> {
        let stats = sqlx::query_as::<_, CourseStats>(
            r#"
            SELECT
                ?1 AS course,
                (SELECT COUNT(*) FROM course_progress WHERE course = ?1) AS enrolled,
                (SELECT COUNT(*) FROM course_progress
                    WHERE course = ?1 AND completed_at IS NOT NULL) AS completed,
                (SELECT AVG(score) FROM kc_submissions WHERE course = ?1) AS average_kc_score,
                (SELECT AVG(rating) FROM feedback
                    WHERE course = ?1 AND rating IS NOT NULL) AS average_rating,
                (SELECT COUNT(*) FROM feedback WHERE course = ?1) AS feedback_count
            "#,
        )
        .bind(course)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// How many learners completed each lesson of a course.
    pub async fn lesson_completion_counts(
        &self,
        course: &str,
    ) -> Result<Vec<LessonCompletionCount>> {
        let rows = sqlx::query_as::<_, LessonCompletionCount>(
            r#"
            SELECT module, lesson, COUNT(*) AS completed
            FROM lesson_progress
            WHERE course = ? AND status = 'completed'
            GROUP BY module, lesson
            ORDER BY module, lesson
            "#,
        )
        .bind(course)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Knowledge check outcomes per module of a course.
    pub async fn kc_pass_rates(&self, course: &str) -> Result<Vec<KcPassRate>> {
        let rows = sqlx::query_as::<_, KcPassRate>(
            r#"
            SELECT
                module,
                COUNT(*) AS attempts,
                COALESCE(SUM(passed), 0) AS passed_attempts,
                COUNT(DISTINCT CASE WHEN passed THEN user_id END) AS users_passed,
                COUNT(DISTINCT user_id) AS users_attempted
            FROM kc_submissions
            WHERE course = ?
            GROUP BY module
            ORDER BY module
            "#,
        )
        .bind(course)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Distinct learners with any course activity at or after `since_millis`.
    pub async fn active_users_since(&self, since_millis: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT user_id) FROM course_progress WHERE last_activity_at >= ?",
        )
        .bind(since_millis)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
