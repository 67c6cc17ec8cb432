//! SQLite persistence for Lectern.
//!
//! A single [`Database`] handle wraps a `sqlx` pool. Methods are grouped
//! by domain into separate modules (users, progress, knowledge checks,
//! feedback, annotations, settings, analytics), all on the same type.
//!
//! Every timestamp column holds milliseconds since the Unix epoch.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lectern_storage::Database;
//!
//! # async fn run() -> lectern_storage::Result<()> {
//! let db = Database::open("sqlite:lectern.db?mode=rwc", 5).await?;
//! let user = db.create_local_user("ada@school.edu", Some("Ada"), "$argon2id$...", "learner").await?;
//! db.record_lesson_view(&user.id, "rust-101", "ownership", "moves").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod schema;
mod types;

mod analytics;
mod annotations;
mod feedback;
mod knowledge;
mod progress;
mod settings;
mod users;

pub use error::{Result, StorageError};
pub use types::*;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

/// Handle to the Lectern database.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `url` and create any missing tables.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Each in-memory connection is its own database, so keep exactly one
        // and never let the pool recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        let db = Self { pool };
        db.ensure_schema().await?;

        info!(in_memory, "Database opened");
        Ok(db)
    }

    /// A fresh in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::open("sqlite::memory:", 1).await
    }

    /// Get the underlying connection pool.
    ///
    /// Prefer using the typed methods instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Cheap liveness check.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Generate a new row id.
    pub(crate) fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
