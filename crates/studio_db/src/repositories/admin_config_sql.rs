//! SQL implementation of the calendar connection store (a single `admin_config` row)

use async_trait::async_trait;
use studio_common::{CalendarConfig, CalendarConfigStore, StudioError, ADMIN_CONFIG_ID};
use tracing::{debug, info};

use crate::error::DbError;
use crate::repositories::appointment_sql::optional_column;
use crate::DbClient;

#[derive(Debug, Clone)]
pub struct SqlCalendarConfigRepository {
    db_client: DbClient,
}

impl SqlCalendarConfigRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing admin_config schema");

        self.db_client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS admin_config (
                    id TEXT PRIMARY KEY,
                    access_token TEXT,
                    refresh_token TEXT,
                    calendar_id TEXT
                )
                "#,
            )
            .await?;

        info!("admin_config schema initialized successfully");
        Ok(())
    }
}

#[async_trait]
impl CalendarConfigStore for SqlCalendarConfigRepository {
    async fn load(&self) -> Result<CalendarConfig, StudioError> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token, calendar_id FROM admin_config WHERE id = $1",
        )
        .bind(ADMIN_CONFIG_ID)
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;

        let Some(row) = row else {
            return Ok(CalendarConfig::default());
        };

        Ok(CalendarConfig {
            access_token: optional_column(&row, "access_token")?,
            refresh_token: optional_column(&row, "refresh_token")?,
            calendar_id: optional_column(&row, "calendar_id")?,
        })
    }

    async fn store_access_token(&self, access_token: &str) -> Result<(), StudioError> {
        sqlx::query(
            "INSERT INTO admin_config (id, access_token) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET access_token = excluded.access_token",
        )
        .bind(ADMIN_CONFIG_ID)
        .bind(access_token.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;
        Ok(())
    }

    async fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StudioError> {
        sqlx::query(
            "INSERT INTO admin_config (id, access_token, refresh_token) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET access_token = excluded.access_token, \
             refresh_token = COALESCE(excluded.refresh_token, admin_config.refresh_token)",
        )
        .bind(ADMIN_CONFIG_ID)
        .bind(access_token.to_string())
        .bind(refresh_token.map(str::to_string))
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;

        info!("Stored calendar OAuth tokens");
        Ok(())
    }

    async fn set_calendar_id(&self, calendar_id: &str) -> Result<(), StudioError> {
        sqlx::query(
            "INSERT INTO admin_config (id, calendar_id) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET calendar_id = excluded.calendar_id",
        )
        .bind(ADMIN_CONFIG_ID)
        .bind(calendar_id.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;
        Ok(())
    }
}
