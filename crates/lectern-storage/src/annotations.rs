//! Reviewer annotations attached to lessons.

use lectern_core::now_millis;

use crate::error::{Result, StorageError};
use crate::types::{AnnotationRecord, NewAnnotation};
use crate::Database;

const ANNOTATION_COLUMNS: &str =
    "id, author_id, course, module, lesson, anchor, body, resolved, created_at, updated_at";

impl Database {
    /// Store a new, unresolved annotation.
    pub async fn insert_annotation(&self, annotation: &NewAnnotation) -> Result<AnnotationRecord> {
        if annotation.body.trim().is_empty() {
            return Err(StorageError::invalid("annotation body must not be empty"));
        }

        let now = now_millis();
        let record = AnnotationRecord {
            id: Self::new_id(),
            author_id: annotation.author_id.clone(),
            course: annotation.course.clone(),
            module: annotation.module.clone(),
            lesson: annotation.lesson.clone(),
            anchor: annotation.anchor.clone(),
            body: annotation.body.clone(),
            resolved: false,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(&format!(
            "INSERT INTO annotations ({ANNOTATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&record.id)
        .bind(&record.author_id)
        .bind(&record.course)
        .bind(&record.module)
        .bind(&record.lesson)
        .bind(&record.anchor)
        .bind(&record.body)
        .bind(record.resolved)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// One annotation by id.
    pub async fn annotation(&self, id: &str) -> Result<Option<AnnotationRecord>> {
        let row = sqlx::query_as::<_, AnnotationRecord>(&format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Annotations on one lesson, oldest first.
    pub async fn annotations_for_lesson(
        &self,
        course: &str,
        module: &str,
        lesson: &str,
    ) -> Result<Vec<AnnotationRecord>> {
        let rows = sqlx::query_as::<_, AnnotationRecord>(&format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations \
             WHERE course = ? AND module = ? AND lesson = ? ORDER BY created_at, id"
        ))
        .bind(course)
        .bind(module)
        .bind(lesson)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All annotations, newest first, optionally only unresolved ones.
    pub async fn list_annotations(&self, unresolved_only: bool) -> Result<Vec<AnnotationRecord>> {
        let filter = if unresolved_only {
            "WHERE resolved = 0 "
        } else {
            ""
        };
        let rows = sqlx::query_as::<_, AnnotationRecord>(&format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations {filter}ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark an annotation resolved or open again.
    pub async fn set_annotation_resolved(
        &self,
        id: &str,
        resolved: bool,
    ) -> Result<AnnotationRecord> {
        let result =
            sqlx::query("UPDATE annotations SET resolved = ?, updated_at = ? WHERE id = ?")
                .bind(resolved)
                .bind(now_millis())
                .bind(id)
                .execute(&self.pool)
                .await?;
        self.require_annotation(id, result.rows_affected()).await
    }

    /// Replace an annotation's text.
    pub async fn update_annotation_body(&self, id: &str, body: &str) -> Result<AnnotationRecord> {
        if body.trim().is_empty() {
            return Err(StorageError::invalid("annotation body must not be empty"));
        }
        let result = sqlx::query("UPDATE annotations SET body = ?, updated_at = ? WHERE id = ?")
            .bind(body)
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.require_annotation(id, result.rows_affected()).await
    }

    async fn require_annotation(&self, id: &str, rows_affected: u64) -> Result<AnnotationRecord> {
        if rows_affected == 0 {
            return Err(StorageError::not_found(format!("annotation {id}")));
        }
        self.annotation(id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("annotation {id}")))
    }

    /// Delete an annotation. Returns whether it existed.
    pub async fn delete_annotation(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM annotations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
