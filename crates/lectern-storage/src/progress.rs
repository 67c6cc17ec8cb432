//! Lesson, module, and course progress.
//!
//! Every write is an upsert so concurrent requests for the same learner
//! and lesson converge on one row.

use std::collections::HashSet;

use lectern_core::now_millis;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::types::{
    CourseProgressRecord, LESSON_COMPLETED, LESSON_IN_PROGRESS, LessonProgressRecord,
    ModuleProgressRecord,
};
use crate::Database;

const LESSON_COLUMNS: &str = "user_id, course, module, lesson, status, view_count, \
                              first_viewed_at, last_viewed_at, completed_at";
const MODULE_COLUMNS: &str = "user_id, course, module, status, kc_passed, best_score, \
                              kc_attempts, completed_at, updated_at";
const COURSE_COLUMNS: &str =
    "user_id, course, current_module, started_at, last_activity_at, completed_at";

impl Database {
    // ========================================================================
    // Lessons
    // ========================================================================

    /// Record that a learner opened a lesson.
    ///
    /// Inserts an `in_progress` row, or bumps the view count of an existing
    /// one. A completed lesson stays completed.
    pub async fn record_lesson_view(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        lesson: &str,
    ) -> Result<LessonProgressRecord> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO lesson_progress
                (user_id, course, module, lesson, status, view_count, first_viewed_at, last_viewed_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(user_id, course, module, lesson) DO UPDATE SET
                view_count = lesson_progress.view_count + 1,
                last_viewed_at = excluded.last_viewed_at
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(lesson)
        .bind(LESSON_IN_PROGRESS)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.lesson_progress(user_id, course, module, lesson).await
    }

    /// Mark a lesson completed. The first completion time is kept.
    pub async fn mark_lesson_completed(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        lesson: &str,
    ) -> Result<LessonProgressRecord> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO lesson_progress
                (user_id, course, module, lesson, status, view_count, first_viewed_at, last_viewed_at, completed_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
            ON CONFLICT(user_id, course, module, lesson) DO UPDATE SET
                status = excluded.status,
                last_viewed_at = excluded.last_viewed_at,
                completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at)
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(lesson)
        .bind(LESSON_COMPLETED)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.lesson_progress(user_id, course, module, lesson).await
    }

    async fn lesson_progress(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        lesson: &str,
    ) -> Result<LessonProgressRecord> {
        sqlx::query_as::<_, LessonProgressRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lesson_progress \
             WHERE user_id = ? AND course = ? AND module = ? AND lesson = ?"
        ))
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(lesson)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found(format!("progress for {course}/{module}/{lesson}")))
    }

    /// All lesson rows for a learner in a course.
    pub async fn lesson_progress_for_course(
        &self,
        user_id: &str,
        course: &str,
    ) -> Result<Vec<LessonProgressRecord>> {
        let rows = sqlx::query_as::<_, LessonProgressRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lesson_progress \
             WHERE user_id = ? AND course = ? ORDER BY module, lesson"
        ))
        .bind(user_id)
        .bind(course)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count completed lessons, considering only `(module, lesson)` pairs
    /// in `lessons`. Rows for lessons no longer in the course are ignored.
    pub async fn count_completed_lessons(
        &self,
        user_id: &str,
        course: &str,
        lessons: &HashSet<(String, String)>,
    ) -> Result<usize> {
        let completed: Vec<(String, String)> = sqlx::query_as(
            "SELECT module, lesson FROM lesson_progress \
             WHERE user_id = ? AND course = ? AND status = ?",
        )
        .bind(user_id)
        .bind(course)
        .bind(LESSON_COMPLETED)
        .fetch_all(&self.pool)
        .await?;

        Ok(completed.into_iter().filter(|key| lessons.contains(key)).count())
    }

    // ========================================================================
    // Modules
    // ========================================================================

    /// Store a module's derived status. `completed_at` is set the first
    /// time the status becomes `completed`.
    pub async fn upsert_module_progress(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        status: &str,
    ) -> Result<ModuleProgressRecord> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO module_progress (user_id, course, module, status, completed_at, updated_at)
            VALUES (?, ?, ?, ?, CASE WHEN ? = 'completed' THEN ? END, ?)
            ON CONFLICT(user_id, course, module) DO UPDATE SET
                status = excluded.status,
                completed_at = COALESCE(module_progress.completed_at, excluded.completed_at),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(status)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.module_progress(user_id, course, module)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("module progress for {course}/{module}")))
    }

    /// Fold a knowledge check result into module progress. `kc_passed`
    /// never goes back to false and `best_score` only increases.
    pub async fn record_kc_result(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        score: i64,
        passed: bool,
    ) -> Result<ModuleProgressRecord> {
        sqlx::query(
            r#"
            INSERT INTO module_progress
                (user_id, course, module, status, kc_passed, best_score, kc_attempts, updated_at)
            VALUES (?, ?, ?, 'in_progress', ?, ?, 1, ?)
            ON CONFLICT(user_id, course, module) DO UPDATE SET
                kc_passed = MAX(module_progress.kc_passed, excluded.kc_passed),
                best_score = MAX(COALESCE(module_progress.best_score, 0), excluded.best_score),
                kc_attempts = module_progress.kc_attempts + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(passed)
        .bind(score)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        self.module_progress(user_id, course, module)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("module progress for {course}/{module}")))
    }

    /// One module's progress row.
    pub async fn module_progress(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
    ) -> Result<Option<ModuleProgressRecord>> {
        let row = sqlx::query_as::<_, ModuleProgressRecord>(&format!(
            "SELECT {MODULE_COLUMNS} FROM module_progress \
             WHERE user_id = ? AND course = ? AND module = ?"
        ))
        .bind(user_id)
        .bind(course)
        .bind(module)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// All module rows for a learner in a course.
    pub async fn module_progress_for_course(
        &self,
        user_id: &str,
        course: &str,
    ) -> Result<Vec<ModuleProgressRecord>> {
        let rows = sqlx::query_as::<_, ModuleProgressRecord>(&format!(
            "SELECT {MODULE_COLUMNS} FROM module_progress \
             WHERE user_id = ? AND course = ? ORDER BY module"
        ))
        .bind(user_id)
        .bind(course)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ========================================================================
    // Courses
    // ========================================================================

    /// Create the course row if needed and bump `last_activity_at`.
    ///
    /// `current_module` replaces the stored one only when given and the
    /// course is not complete.
    pub async fn touch_course(
        &self,
        user_id: &str,
        course: &str,
        current_module: Option<&str>,
    ) -> Result<CourseProgressRecord> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO course_progress (user_id, course, current_module, started_at, last_activity_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, course) DO UPDATE SET
                last_activity_at = excluded.last_activity_at,
                current_module = CASE
                    WHEN excluded.current_module IS NOT NULL AND course_progress.completed_at IS NULL
                        THEN excluded.current_module
                    ELSE course_progress.current_module
                END
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(current_module)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require_course_progress(user_id, course).await
    }

    /// Set the module the learner is working through. A completed course
    /// keeps its pointer.
    pub async fn set_current_module(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
    ) -> Result<CourseProgressRecord> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO course_progress (user_id, course, current_module, started_at, last_activity_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, course) DO UPDATE SET
                current_module = CASE
                    WHEN course_progress.completed_at IS NULL THEN excluded.current_module
                    ELSE course_progress.current_module
                END,
                last_activity_at = excluded.last_activity_at
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(module)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(user_id, course, module, "Current module updated");
        self.require_course_progress(user_id, course).await
    }

    /// Mark a course completed. Returns `true` only the first time.
    pub async fn mark_course_completed(&self, user_id: &str, course: &str) -> Result<bool> {
        let now = now_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO course_progress (user_id, course, started_at, last_activity_at, completed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, course) DO UPDATE SET
                completed_at = excluded.completed_at
            WHERE course_progress.completed_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(course)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// One course row.
    pub async fn course_progress(
        &self,
        user_id: &str,
        course: &str,
    ) -> Result<Option<CourseProgressRecord>> {
        let row = sqlx::query_as::<_, CourseProgressRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM course_progress WHERE user_id = ? AND course = ?"
        ))
        .bind(user_id)
        .bind(course)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn require_course_progress(
        &self,
        user_id: &str,
        course: &str,
    ) -> Result<CourseProgressRecord> {
        self.course_progress(user_id, course)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("course progress for {course}")))
    }

    /// Every course a learner has touched, most recent first.
    pub async fn course_progress_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<CourseProgressRecord>> {
        let rows = sqlx::query_as::<_, CourseProgressRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM course_progress \
             WHERE user_id = ? ORDER BY last_activity_at DESC, course"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete all of a learner's progress and submissions for a course.
    /// Returns the number of rows removed.
    pub async fn reset_course_progress(&self, user_id: &str, course: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for table in [
            "lesson_progress",
            "module_progress",
            "course_progress",
            "kc_submissions",
        ] {
            removed += sqlx::query(&format!(
                "DELETE FROM {table} WHERE user_id = ? AND course = ?"
            ))
            .bind(user_id)
            .bind(course)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        debug!(user_id, course, removed, "Course progress reset");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::test_support::db_with_user;

    fn key(module: &str, lesson: &str) -> (String, String) {
        (module.to_string(), lesson.to_string())
    }

    #[tokio::test]
    async fn test_view_then_complete_never_downgrades() {
        let (db, user) = db_with_user("ada@school.edu").await;

        let viewed = db
            .record_lesson_view(&user.id, "rust-101", "ownership", "moves")
            .await
            .unwrap();
        assert_eq!(viewed.status, "in_progress");
        assert_eq!(viewed.view_count, 1);

        let completed = db
            .mark_lesson_completed(&user.id, "rust-101", "ownership", "moves")
            .await
            .unwrap();
        assert!(completed.is_completed());
        let first_completed_at = completed.completed_at;

        let viewed_again = db
            .record_lesson_view(&user.id, "rust-101", "ownership", "moves")
            .await
            .unwrap();
        assert!(viewed_again.is_completed());
        assert_eq!(viewed_again.view_count, 2);

        let completed_again = db
            .mark_lesson_completed(&user.id, "rust-101", "ownership", "moves")
            .await
            .unwrap();
        assert_eq!(completed_again.completed_at, first_completed_at);
    }

    #[tokio::test]
    async fn test_count_completed_restricted_to_set() {
        let (db, user) = db_with_user("ada@school.edu").await;
        for lesson in ["moves", "copies", "removed-lesson"] {
            db.mark_lesson_completed(&user.id, "rust-101", "ownership", lesson)
                .await
                .unwrap();
        }
        db.record_lesson_view(&user.id, "rust-101", "ownership", "clones")
            .await
            .unwrap();

        let tree: HashSet<_> = [
            key("ownership", "moves"),
            key("ownership", "copies"),
            key("ownership", "clones"),
        ]
        .into_iter()
        .collect();
        let count = db
            .count_completed_lessons(&user.id, "rust-101", &tree)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_touch_course_current_module_rules() {
        let (db, user) = db_with_user("ada@school.edu").await;

        let row = db.touch_course(&user.id, "rust-101", None).await.unwrap();
        assert!(row.current_module.is_none());

        let row = db
            .touch_course(&user.id, "rust-101", Some("ownership"))
            .await
            .unwrap();
        assert_eq!(row.current_module.as_deref(), Some("ownership"));

        let row = db.touch_course(&user.id, "rust-101", None).await.unwrap();
        assert_eq!(row.current_module.as_deref(), Some("ownership"));

        assert!(db.mark_course_completed(&user.id, "rust-101").await.unwrap());
        assert!(!db.mark_course_completed(&user.id, "rust-101").await.unwrap());

        let row = db
            .touch_course(&user.id, "rust-101", Some("borrowing"))
            .await
            .unwrap();
        assert_eq!(row.current_module.as_deref(), Some("ownership"));
        assert!(row.is_completed());
    }

    #[tokio::test]
    async fn test_set_current_module_after_completion() {
        let (db, user) = db_with_user("ada@school.edu").await;

        let row = db
            .set_current_module(&user.id, "rust-101", "borrowing")
            .await
            .unwrap();
        assert_eq!(row.current_module.as_deref(), Some("borrowing"));

        db.mark_course_completed(&user.id, "rust-101").await.unwrap();
        let row = db
            .set_current_module(&user.id, "rust-101", "ownership")
            .await
            .unwrap();
        assert_eq!(row.current_module.as_deref(), Some("borrowing"));
        assert!(row.is_completed());
    }

    #[tokio::test]
    async fn test_module_progress_kc_is_sticky() {
        let (db, user) = db_with_user("ada@school.edu").await;

        let row = db
            .record_kc_result(&user.id, "rust-101", "ownership", 90, true)
            .await
            .unwrap();
        assert!(row.kc_passed);
        assert_eq!(row.best_score, Some(90));

        let row = db
            .record_kc_result(&user.id, "rust-101", "ownership", 40, false)
            .await
            .unwrap();
        assert!(row.kc_passed);
        assert_eq!(row.best_score, Some(90));
        assert_eq!(row.kc_attempts, 2);

        let row = db
            .upsert_module_progress(&user.id, "rust-101", "ownership", "completed")
            .await
            .unwrap();
        assert_eq!(row.status, "completed");
        assert!(row.completed_at.is_some());
        assert!(row.kc_passed);
    }

    #[tokio::test]
    async fn test_reset_course_progress() {
        let (db, user) = db_with_user("ada@school.edu").await;
        db.mark_lesson_completed(&user.id, "rust-101", "ownership", "moves")
            .await
            .unwrap();
        db.touch_course(&user.id, "rust-101", Some("ownership"))
            .await
            .unwrap();
        db.mark_lesson_completed(&user.id, "go-101", "basics", "hello")
            .await
            .unwrap();

        let removed = db.reset_course_progress(&user.id, "rust-101").await.unwrap();
        assert_eq!(removed, 2);
        assert!(db.course_progress(&user.id, "rust-101").await.unwrap().is_none());
        assert_eq!(
            db.lesson_progress_for_course(&user.id, "go-101")
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
