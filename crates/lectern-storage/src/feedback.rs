//! Learner feedback on courses, modules, and lessons.

use lectern_core::now_millis;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::types::{FeedbackFilter, FeedbackRecord, NewFeedback};
use crate::Database;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

impl Database {
    /// Store feedback and return the stored row.
    pub async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRecord> {
        if let Some(rating) = feedback.rating
            && !(1..=5).contains(&rating)
        {
            return Err(StorageError::invalid(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }

        let record = FeedbackRecord {
            id: Self::new_id(),
            user_id: feedback.user_id.clone(),
            course: feedback.course.clone(),
            module: feedback.module.clone(),
            lesson: feedback.lesson.clone(),
            rating: feedback.rating,
            comment: feedback.comment.clone(),
            created_at: now_millis(),
        };

        sqlx::query(
            r#"
            INSERT INTO feedback (id, user_id, course, module, lesson, rating, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.course)
        .bind(&record.module)
        .bind(&record.lesson)
        .bind(record.rating)
        .bind(&record.comment)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %record.id, course = %record.course, "Feedback stored");
        Ok(record)
    }

    /// List feedback matching `filter`, newest first.
    pub async fn list_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, user_id, course, module, lesson, rating, comment, created_at \
             FROM feedback WHERE 1 = 1",
        );
        if let Some(course) = &filter.course {
            query.push(" AND course = ").push_bind(course);
        }
        if let Some(min) = filter.min_rating {
            query.push(" AND rating >= ").push_bind(min);
        }
        if let Some(max) = filter.max_rating {
            query.push(" AND rating <= ").push_bind(max);
        }
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        query
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(limit);

        let rows = query
            .build_query_as::<FeedbackRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Delete one feedback entry. Returns whether it existed.
    pub async fn delete_feedback(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
