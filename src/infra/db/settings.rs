use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, SettingsRepo, UpsertSettingParams},
    domain::{entities::SettingRecord, types::SettingFormat},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SettingRow {
    id: i64,
    name: String,
    value: Option<String>,
    format: SettingFormat,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SettingRow> for SettingRecord {
    fn from(row: SettingRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            value: row.value,
            format: row.format,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SettingsRepo for PostgresRepositories {
    async fn list_settings(&self) -> Result<Vec<SettingRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SettingRow>(
            r#"
            SELECT id, name, value, format, created_at, updated_at
            FROM settings
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SettingRecord::from).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SettingRecord>, RepoError> {
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            SELECT id, name, value, format, created_at, updated_at
            FROM settings
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SettingRecord::from))
    }

    async fn upsert_setting(
        &self,
        params: UpsertSettingParams,
    ) -> Result<SettingRecord, RepoError> {
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            INSERT INTO settings (name, value, format)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET
                value = EXCLUDED.value,
                format = EXCLUDED.format,
                updated_at = now()
            RETURNING id, name, value, format, created_at, updated_at
            "#,
        )
        .bind(&params.name)
        .bind(&params.value)
        .bind(params.format)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SettingRecord::from(row))
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM settings WHERE name = $1")
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
