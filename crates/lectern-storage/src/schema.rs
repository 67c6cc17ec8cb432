//! Table creation. All CREATE statements live here.

use tracing::debug;

use crate::Database;
use crate::error::Result;

const TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        display_name TEXT,
        role TEXT NOT NULL DEFAULT 'learner',
        password_hash TEXT,
        oidc_subject TEXT UNIQUE,
        created_at INTEGER NOT NULL,
        last_login_at INTEGER
    )"#,
    r#"CREATE TABLE IF NOT EXISTS lesson_progress (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course TEXT NOT NULL,
        module TEXT NOT NULL,
        lesson TEXT NOT NULL,
        status TEXT NOT NULL,
        view_count INTEGER NOT NULL DEFAULT 0,
        first_viewed_at INTEGER NOT NULL,
        last_viewed_at INTEGER NOT NULL,
        completed_at INTEGER,
        PRIMARY KEY (user_id, course, module, lesson)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS module_progress (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course TEXT NOT NULL,
        module TEXT NOT NULL,
        status TEXT NOT NULL,
        kc_passed INTEGER NOT NULL DEFAULT 0,
        best_score INTEGER,
        kc_attempts INTEGER NOT NULL DEFAULT 0,
        completed_at INTEGER,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, course, module)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS course_progress (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course TEXT NOT NULL,
        current_module TEXT,
        started_at INTEGER NOT NULL,
        last_activity_at INTEGER NOT NULL,
        completed_at INTEGER,
        PRIMARY KEY (user_id, course)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS kc_submissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course TEXT NOT NULL,
        module TEXT NOT NULL,
        answers TEXT NOT NULL,
        score INTEGER NOT NULL,
        passed INTEGER NOT NULL,
        attempt INTEGER NOT NULL,
        submitted_at INTEGER NOT NULL,
        UNIQUE (user_id, course, module, attempt)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS feedback (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course TEXT NOT NULL,
        module TEXT,
        lesson TEXT,
        rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
        comment TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS annotations (
        id TEXT PRIMARY KEY,
        author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course TEXT NOT NULL,
        module TEXT NOT NULL,
        lesson TEXT NOT NULL,
        anchor TEXT,
        body TEXT NOT NULL,
        resolved INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_by TEXT,
        updated_at INTEGER NOT NULL
    )"#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_lesson_progress_course ON lesson_progress(course, module, lesson)",
    "CREATE INDEX IF NOT EXISTS idx_course_progress_activity ON course_progress(last_activity_at)",
    "CREATE INDEX IF NOT EXISTS idx_kc_submissions_lookup ON kc_submissions(user_id, course, module)",
    "CREATE INDEX IF NOT EXISTS idx_feedback_course ON feedback(course, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_annotations_lesson ON annotations(course, module, lesson)",
];

impl Database {
    /// Ensure all tables and indexes exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        for statement in TABLES.iter().chain(INDEXES) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Database schema verified");
        Ok(())
    }
}
