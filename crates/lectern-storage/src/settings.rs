//! Runtime settings editable from the admin surface.
//!
//! Values are JSON documents stored as text.

use lectern_core::now_millis;
use serde_json::Value;

use crate::error::{Result, StorageError};
use crate::types::SettingRecord;
use crate::Database;

#[derive(sqlx::FromRow)]
struct SettingRow {
    key: String,
    value: String,
    updated_by: Option<String>,
    updated_at: i64,
}

impl TryFrom<SettingRow> for SettingRecord {
    type Error = serde_json::Error;

    fn try_from(row: SettingRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            key: row.key,
            value: serde_json::from_str(&row.value)?,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

impl Database {
    /// Read one setting.
    pub async fn get_setting(&self, key: &str) -> Result<Option<SettingRecord>> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value, updated_by, updated_at FROM settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SettingRecord::try_from)
            .transpose()
            .map_err(StorageError::from)
    }

    /// Insert or replace a setting.
    pub async fn put_setting(
        &self,
        key: &str,
        value: &Value,
        updated_by: Option<&str>,
    ) -> Result<SettingRecord> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StorageError::invalid("setting key must not be empty"));
        }

        let updated_at = now_millis();
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_by, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .bind(updated_by)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(SettingRecord {
            key: key.to_string(),
            value: value.clone(),
            updated_by: updated_by.map(str::to_string),
            updated_at,
        })
    }

    /// All settings, ordered by key.
    pub async fn list_settings(&self) -> Result<Vec<SettingRecord>> {
        let rows = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value, updated_by, updated_at FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| SettingRecord::try_from(row).map_err(StorageError::from))
            .collect()
    }

    /// Remove a setting. Returns whether it existed.
    pub async fn delete_setting(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
