//! User account operations.

use lectern_core::now_millis;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::types::UserRecord;
use crate::Database;

const USER_COLUMNS: &str = "id, email, display_name, role, created_at, last_login_at";

impl Database {
    /// Create or update a user signing in through OIDC.
    ///
    /// Matches an existing account by email. New accounts get `role`;
    /// existing accounts keep theirs. The subject and name are refreshed.
    pub async fn upsert_oidc_user(
        &self,
        subject: &str,
        email: &str,
        display_name: Option<&str>,
        role: &str,
    ) -> Result<UserRecord> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, oidc_subject, created_at, last_login_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                oidc_subject = excluded.oidc_subject,
                display_name = COALESCE(excluded.display_name, users.display_name),
                last_login_at = excluded.last_login_at
            "#,
        )
        .bind(Self::new_id())
        .bind(email.trim())
        .bind(display_name)
        .bind(role)
        .bind(subject)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StorageError::from_unique(e, format!("OIDC subject '{subject}' belongs to another user"))
        })?;

        self.user_by_email(email)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("user {email}")))
    }

    /// Create a user with a password. Fails with `Conflict` if the email
    /// is taken.
    pub async fn create_local_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        password_hash: &str,
        role: &str,
    ) -> Result<UserRecord> {
        let id = Self::new_id();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email.trim())
        .bind(display_name)
        .bind(role)
        .bind(password_hash)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from_unique(e, format!("a user with email {email} already exists")))?;

        info!(user_id = %id, "Created local user");
        self.user_by_id(&id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("user {id}")))
    }

    /// Insert a user with a fixed id if it does not exist yet.
    pub async fn ensure_user(
        &self,
        id: &str,
        email: &str,
        display_name: Option<&str>,
        role: &str,
    ) -> Result<UserRecord> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(display_name)
        .bind(role)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from_unique(e, format!("email {email} belongs to another user")))?;

        self.user_by_id(id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("user {id}")))
    }

    /// Get a user by id.
    pub async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Stored password hash for a local account, if any.
    pub async fn password_hash_for(&self, email: &str) -> Result<Option<String>> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE email = ?")
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash.flatten())
    }

    /// Record a successful sign-in.
    pub async fn touch_login(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Change a user's role.
    pub async fn set_role(&self, id: &str, role: &str) -> Result<UserRecord> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("user {id}")));
        }
        info!(user_id = %id, role, "Changed user role");
        self.user_by_id(id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("user {id}")))
    }

    /// All users, oldest first.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, email"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}
